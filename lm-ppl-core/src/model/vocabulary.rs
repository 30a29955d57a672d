use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::corpus::{Corpus, Token};
use crate::error::{LmError, Result};

/// Dense identifier of a vocabulary entry.
pub type TokenId = u32;

/// How tokens that were never observed while fitting are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OovPolicy {
	/// Fail with [`LmError::UnknownToken`].
	#[default]
	Reject,
	/// Map every unknown token to one reserved id placed after the last real
	/// id. The bucket has a count of zero and widens the smoothing support by one.
	Bucket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Entry {
	token: Token,
	count: u64,
}

/// Mutable half of the vocabulary: accumulates tokens in first-seen order.
///
/// # Responsibilities
/// - Assign the next sequential id to every new token
/// - Count occurrences and sentences
///
/// Consumed by [`VocabularyBuilder::freeze`], which returns the read-only
/// [`Vocabulary`].
#[derive(Debug, Default, Clone)]
pub struct VocabularyBuilder {
	ids: HashMap<Token, TokenId>,
	entries: Vec<Entry>,
	total_tokens: u64,
	total_sentences: usize,
}

impl VocabularyBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one sentence. Empty sentences still count as sentences.
	///
	/// # Errors
	/// Returns [`LmError::Internal`] if the number of distinct tokens no
	/// longer fits a [`TokenId`].
	pub fn observe_sentence(&mut self, sentence: &[Token]) -> Result<()> {
		self.total_sentences += 1;
		for token in sentence {
			self.total_tokens += 1;
			if let Some(&id) = self.ids.get(token) {
				self.entries[id as usize].count += 1;
				continue;
			}
			let id = TokenId::try_from(self.entries.len())
				.map_err(|_| LmError::Internal("vocabulary exceeds the TokenId range".into()))?;
			self.ids.insert(token.clone(), id);
			self.entries.push(Entry { token: token.clone(), count: 1 });
		}
		Ok(())
	}

	/// Ends the build phase.
	///
	/// # Errors
	/// Returns [`LmError::EmptyCorpus`] if no token was observed.
	pub fn freeze(self, oov_policy: OovPolicy) -> Result<Vocabulary> {
		if self.total_tokens == 0 {
			return Err(LmError::EmptyCorpus);
		}
		if oov_policy == OovPolicy::Bucket && TokenId::try_from(self.entries.len()).is_err() {
			return Err(LmError::Internal("no id left for the out-of-vocabulary bucket".into()));
		}
		Ok(Vocabulary {
			ids: self.ids,
			entries: self.entries,
			total_tokens: self.total_tokens,
			total_sentences: self.total_sentences,
			oov_policy,
		})
	}
}

/// Frozen mapping from tokens to dense ids and occurrence counts.
///
/// # Invariants
/// - Ids form the contiguous range `[0, len())`, assigned in first-seen order
/// - `total_tokens` is the sum of all counts and is never zero
/// - No method mutates a frozen vocabulary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vocabulary {
	#[serde(skip)]
	ids: HashMap<Token, TokenId>,
	entries: Vec<Entry>,
	total_tokens: u64,
	total_sentences: usize,
	oov_policy: OovPolicy,
}

impl Vocabulary {
	/// Builds the vocabulary of `corpus` in a single pass.
	pub fn build(corpus: &Corpus, oov_policy: OovPolicy) -> Result<Self> {
		let mut builder = VocabularyBuilder::new();
		for sentence in corpus {
			builder.observe_sentence(sentence)?;
		}
		builder.freeze(oov_policy)
	}

	/// Number of distinct observed tokens (V).
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Always `false`: an empty vocabulary cannot be frozen.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Size of the outcome space used by smoothing: V, plus one when unknown
	/// tokens go to a bucket.
	pub fn support_size(&self) -> usize {
		match self.oov_policy {
			OovPolicy::Reject => self.len(),
			OovPolicy::Bucket => self.len() + 1,
		}
	}

	pub fn oov_policy(&self) -> OovPolicy {
		self.oov_policy
	}

	/// Id reserved for unknown tokens, if the policy has one.
	pub fn oov_id(&self) -> Option<TokenId> {
		match self.oov_policy {
			OovPolicy::Reject => None,
			// Checked in `freeze`.
			OovPolicy::Bucket => Some(self.len() as TokenId),
		}
	}

	/// Sum of all token occurrences.
	pub fn total_tokens(&self) -> u64 {
		self.total_tokens
	}

	/// Number of sentences observed, empty ones included.
	pub fn total_sentences(&self) -> usize {
		self.total_sentences
	}

	/// Id of an observed token.
	pub fn id(&self, token: &str) -> Option<TokenId> {
		self.ids.get(token).copied()
	}

	/// Resolves a token according to the out-of-vocabulary policy.
	///
	/// # Errors
	/// Returns [`LmError::UnknownToken`] for unseen tokens under
	/// [`OovPolicy::Reject`].
	pub fn resolve(&self, token: &str) -> Result<TokenId> {
		self.id(token)
			.or_else(|| self.oov_id())
			.ok_or_else(|| LmError::UnknownToken { token: token.to_owned() })
	}

	/// Resolves every token of a sentence.
	pub fn encode(&self, sentence: &[Token]) -> Result<Vec<TokenId>> {
		sentence.iter().map(|token| self.resolve(token)).collect()
	}

	/// Token string of `id`. `None` for the bucket and for ids out of range.
	pub fn token(&self, id: TokenId) -> Option<&str> {
		self.entries.get(id as usize).map(|entry| entry.token.as_str())
	}

	/// Occurrence count of `id`; zero for the bucket and for ids out of range.
	pub fn count(&self, id: TokenId) -> u64 {
		self.entries.get(id as usize).map_or(0, |entry| entry.count)
	}

	/// Iterates `(id, token, count)` in id order.
	pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str, u64)> {
		self.entries
			.iter()
			.enumerate()
			.map(|(id, entry)| (id as TokenId, entry.token.as_str(), entry.count))
	}

	/// The `k` most frequent tokens; ties keep id order.
	pub fn most_frequent(&self, k: usize) -> Vec<(TokenId, &str, u64)> {
		let mut ranked: Vec<_> = self.iter().collect();
		ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
		ranked.truncate(k);
		ranked
	}
}
