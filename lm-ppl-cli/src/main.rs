use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;

use lm_ppl_core::io::build_output_path;
use lm_ppl_core::{
	Comparator, Corpus, IdentityStemmer, LmConfig, ModelComparison, NGramModel, Normalizer, OovPolicy, Order,
	SnowballStemmer, Smoothing, Stage, Vocabulary, WhitespaceTokenizer, WordPunctTokenizer, score_corpus,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "N-gram perplexity toolkit for code-mixed corpora", long_about = None)]
struct Cli {
	/// Increase verbosity (-v, -vv)
	#[arg(short = 'v', long, global = true, action = ArgAction::Count)]
	verbose: u8,

	/// Decrease verbosity (-q, -qq)
	#[arg(short = 'q', long, global = true, action = ArgAction::Count)]
	quiet: u8,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Compare the corpus perplexity of several model orders
	Compare(CompareArgs),
	/// Print the perplexity of every sentence for one order
	Score(ScoreArgs),
	/// Print vocabulary statistics
	Vocab(VocabArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TokenizerArg {
	/// Words and punctuation runs
	Wordpunct,
	/// Whitespace only
	Whitespace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OovArg {
	/// Fail on tokens unseen while fitting
	Reject,
	/// Send unseen tokens to a shared bucket
	Bucket,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SmoothingArg {
	Unsmoothed,
	Laplace,
}

impl From<OovArg> for OovPolicy {
	fn from(arg: OovArg) -> Self {
		match arg {
			OovArg::Reject => OovPolicy::Reject,
			OovArg::Bucket => OovPolicy::Bucket,
		}
	}
}

impl From<SmoothingArg> for Smoothing {
	fn from(arg: SmoothingArg) -> Self {
		match arg {
			SmoothingArg::Unsmoothed => Smoothing::Unsmoothed,
			SmoothingArg::Laplace => Smoothing::Laplace,
		}
	}
}

/// Text normalization options.
#[derive(Args, Debug)]
struct TextArgs {
	/// Tokenizer applied to every line
	#[arg(long, value_enum, default_value_t = TokenizerArg::Wordpunct)]
	tokenizer: TokenizerArg,

	/// Only case-fold tokens, do not stem them
	#[arg(long)]
	no_stem: bool,
}

impl TextArgs {
	fn normalizer(&self) -> Normalizer {
		match (self.tokenizer, self.no_stem) {
			(TokenizerArg::Wordpunct, false) => Normalizer::new(WordPunctTokenizer, SnowballStemmer::english()),
			(TokenizerArg::Wordpunct, true) => Normalizer::new(WordPunctTokenizer, IdentityStemmer),
			(TokenizerArg::Whitespace, false) => Normalizer::new(WhitespaceTokenizer, SnowballStemmer::english()),
			(TokenizerArg::Whitespace, true) => Normalizer::new(WhitespaceTokenizer, IdentityStemmer),
		}
	}
}

/// Model fitting options shared by `compare` and `score`.
#[derive(Args, Debug)]
struct ModelArgs {
	/// JSON configuration file; flags override its values
	#[arg(long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Out-of-vocabulary policy for evaluation text
	#[arg(long, value_enum)]
	oov: Option<OovArg>,

	/// Estimator for unigram models
	#[arg(long, value_enum)]
	unigram_smoothing: Option<SmoothingArg>,

	/// Estimator for bigram and trigram models
	#[arg(long, value_enum)]
	ngram_smoothing: Option<SmoothingArg>,

	/// Worker threads (defaults to all cores)
	#[arg(long, value_name = "N")]
	threads: Option<usize>,

	/// Separate evaluation corpus (defaults to the training corpus)
	#[arg(long, value_name = "PATH", conflicts_with = "holdout")]
	eval: Option<PathBuf>,

	/// Fraction of the corpus held out for evaluation
	#[arg(long, value_name = "RATIO")]
	holdout: Option<f64>,

	/// Seed of the held-out split
	#[arg(long, default_value_t = 42)]
	seed: u64,

	#[command(flatten)]
	text: TextArgs,
}

impl ModelArgs {
	fn config(&self, orders: Option<&[usize]>) -> Result<LmConfig> {
		let mut cfg = match &self.config {
			Some(path) => LmConfig::from_json_file(path)
				.with_context(|| format!("failed to load configuration {}", path.display()))?,
			None => LmConfig::default(),
		};
		if let Some(orders) = orders {
			cfg.orders = orders.to_vec();
		}
		if let Some(oov) = self.oov {
			cfg.oov_policy = oov.into();
		}
		if let Some(smoothing) = self.unigram_smoothing {
			cfg.unigram_smoothing = smoothing.into();
		}
		if let Some(smoothing) = self.ngram_smoothing {
			cfg.ngram_smoothing = smoothing.into();
		}
		if self.threads.is_some() {
			cfg.threads = self.threads;
		}
		cfg.validate()?;
		Ok(cfg)
	}

	/// Loads the training corpus and, when requested, a separate evaluation corpus.
	fn corpora(&self, corpus: &Path) -> Result<(Corpus, Option<Corpus>)> {
		let normalizer = self.text.normalizer();
		let train = load_corpus(corpus, &normalizer)?;
		if let Some(path) = &self.eval {
			return Ok((train, Some(load_corpus(path, &normalizer)?)));
		}
		match self.holdout {
			Some(ratio) => {
				let (train, held_out) = train.split(ratio, self.seed)?;
				info!("held out {} of {} sentences (seed {})", held_out.len(), train.len() + held_out.len(), self.seed);
				Ok((train, Some(held_out)))
			}
			None => Ok((train, None)),
		}
	}
}

#[derive(Args, Debug)]
struct CompareArgs {
	/// Corpus file, one sentence per line
	corpus: PathBuf,

	/// Orders to compare
	#[arg(long, value_delimiter = ',', default_value = "1,2,3")]
	orders: Vec<usize>,

	#[command(flatten)]
	model: ModelArgs,

	/// Emit JSON instead of a table
	#[arg(long)]
	json: bool,

	/// Write the report to this file
	#[arg(short, long, value_name = "PATH", conflicts_with = "save")]
	output: Option<PathBuf>,

	/// Write the report next to the corpus (`<corpus>.ppl.txt` or `.ppl.json`)
	#[arg(long)]
	save: bool,
}

#[derive(Args, Debug)]
struct ScoreArgs {
	/// Corpus file, one sentence per line
	corpus: PathBuf,

	/// Model order (1, 2 or 3)
	#[arg(long, default_value_t = 2)]
	order: usize,

	#[command(flatten)]
	model: ModelArgs,
}

#[derive(Args, Debug)]
struct VocabArgs {
	/// Corpus file, one sentence per line
	corpus: PathBuf,

	/// Number of most frequent tokens to list
	#[arg(long, default_value_t = 20)]
	top: usize,

	#[command(flatten)]
	text: TextArgs,
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose, cli.quiet);

	match cli.command {
		Commands::Compare(args) => run_compare(args),
		Commands::Score(args) => run_score(args),
		Commands::Vocab(args) => run_vocab(args),
	}
}

fn init_logging(verbose: u8, quiet: u8) {
	use log::LevelFilter;

	let level = if quiet > 0 {
		match quiet {
			1 => LevelFilter::Warn,
			_ => LevelFilter::Error,
		}
	} else {
		match verbose {
			0 => LevelFilter::Info,
			1 => LevelFilter::Debug,
			_ => LevelFilter::Trace,
		}
	};

	let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
	builder.format_timestamp_millis();
	if verbose > 0 || quiet > 0 {
		builder.filter_level(level);
	}
	let _ = builder.try_init();
}

fn load_corpus(path: &Path, normalizer: &Normalizer) -> Result<Corpus> {
	Corpus::load(path, normalizer)
		.map_err(|err| err.in_stage(Stage::Load))
		.with_context(|| format!("failed to read corpus {}", path.display()))
}

fn run_compare(args: CompareArgs) -> Result<()> {
	// Orders are checked before the corpus is read.
	let cfg = args.model.config(Some(&args.orders))?;
	let (train, evaluation) = args.model.corpora(&args.corpus)?;

	let comparator = Comparator::new(cfg);
	let comparison = match &evaluation {
		Some(evaluation) => comparator.compare_held_out(&train, evaluation)?,
		None => comparator.compare(&train)?,
	};

	let report = render(&comparison, args.json)?;
	print!("{report}");

	let destination = match (args.output, args.save) {
		(Some(path), _) => Some(path),
		(None, true) => Some(build_output_path(&args.corpus, if args.json { "ppl.json" } else { "ppl.txt" })?),
		(None, false) => None,
	};
	if let Some(path) = destination {
		fs::write(&path, &report).with_context(|| format!("failed to write {}", path.display()))?;
		info!("report written to {}", path.display());
	}
	Ok(())
}

fn render(comparison: &ModelComparison, json: bool) -> Result<String> {
	if json {
		let mut out = serde_json::to_string_pretty(comparison)?;
		out.push('\n');
		Ok(out)
	} else {
		Ok(comparison.to_string())
	}
}

fn run_score(args: ScoreArgs) -> Result<()> {
	let order = Order::try_from(args.order)?;
	let cfg = args.model.config(Some(std::slice::from_ref(&args.order)))?;
	let (train, evaluation) = args.model.corpora(&args.corpus)?;
	let evaluation = evaluation.as_ref().unwrap_or(&train);

	let vocabulary = Vocabulary::build(&train, cfg.oov_policy)
		.map(Arc::new)
		.map_err(|err| err.in_stage(Stage::Vocabulary))?;
	let model = NGramModel::fit(order, &train, vocabulary, &cfg).map_err(|err| err.in_stage(Stage::Counting))?;
	let result = score_corpus(&model, evaluation, &cfg).map_err(|err| err.in_stage(Stage::Scoring))?;

	println!("sentence\ttokens\tperplexity");
	for score in result.sentences() {
		println!("{}\t{}\t{:.4}", score.index(), score.tokens(), score.perplexity());
	}
	println!("{order} mean perplexity: {:.4} ({} scored, {} skipped)", result.mean(), result.scored(), result.skipped());
	Ok(())
}

fn run_vocab(args: VocabArgs) -> Result<()> {
	let corpus = load_corpus(&args.corpus, &args.text.normalizer())?;
	let vocabulary = Vocabulary::build(&corpus, OovPolicy::Reject).map_err(|err| err.in_stage(Stage::Vocabulary))?;

	println!("V = {}", vocabulary.len());
	println!("tokens = {}", vocabulary.total_tokens());
	println!("sentences = {}", vocabulary.total_sentences());
	println!("id\tcount\ttoken");
	for (id, token, count) in vocabulary.most_frequent(args.top) {
		println!("{id}\t{count}\t{token}");
	}
	Ok(())
}
