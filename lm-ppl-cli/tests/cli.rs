use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn temp_workspace() -> TempDir {
	tempfile::tempdir().expect("create tempdir")
}

fn write_corpus(workspace: &TempDir, name: &str, contents: &str) -> PathBuf {
	let path = workspace.path().join(name);
	fs::write(&path, contents).expect("write corpus");
	path
}

fn lm_ppl() -> Command {
	let mut cmd = Command::cargo_bin("lm-ppl").expect("binary exists");
	cmd.arg("--quiet");
	cmd
}

fn stdout_of(cmd: &mut Command) -> String {
	let output = cmd.assert().success().get_output().stdout.clone();
	String::from_utf8(output).expect("utf-8 stdout")
}

#[test]
fn compare_prints_a_table_for_every_order() {
	let workspace = temp_workspace();
	let corpus = write_corpus(&workspace, "pets.txt", "the cat sat\nthe dog sat\n\na cat ran\n");

	let stdout = stdout_of(lm_ppl().args(["compare", "--no-stem"]).arg(&corpus));
	assert!(stdout.contains("corpus: pets"));
	assert!(stdout.contains("V = 6"));
	for order in ["unigram", "bigram", "trigram"] {
		assert!(stdout.contains(order), "missing {order} in\n{stdout}");
	}
	assert!(stdout.contains("not directly comparable"));
}

#[test]
fn compare_json_can_be_saved_next_to_the_corpus() {
	let workspace = temp_workspace();
	let corpus = write_corpus(&workspace, "tweets.txt", "yeh movie achhi hai\nmovie achhi thi\n");

	let stdout = stdout_of(
		lm_ppl()
			.args(["compare", "--orders", "2,3", "--json", "--save", "--unigram-smoothing", "laplace"])
			.arg(&corpus),
	);
	let report: Value = serde_json::from_str(&stdout).expect("report is valid JSON");
	assert_eq!(report["results"].as_array().map(Vec::len), Some(2));
	assert_eq!(report["results"][0]["order"], "bigram");
	assert_eq!(report["asymmetric_smoothing"], false);

	let saved = workspace.path().join("tweets.ppl.json");
	assert!(saved.exists(), "report was saved");
	assert_eq!(fs::read_to_string(saved).expect("read report"), stdout);
}

#[test]
fn invalid_order_fails_before_reading_the_corpus() {
	let workspace = temp_workspace();
	let missing = workspace.path().join("missing.txt");

	let output = lm_ppl()
		.args(["compare", "--orders", "2,4"])
		.arg(&missing)
		.assert()
		.failure()
		.get_output()
		.stderr
		.clone();
	let stderr = String::from_utf8(output).expect("utf-8 stderr");
	assert!(stderr.contains("unsupported n-gram order 4"), "stderr: {stderr}");
}

#[test]
fn empty_corpus_reports_the_failing_stage() {
	let workspace = temp_workspace();
	let corpus = write_corpus(&workspace, "empty.txt", "");

	let output = lm_ppl().arg("vocab").arg(&corpus).assert().failure().get_output().stderr.clone();
	let stderr = String::from_utf8(output).expect("utf-8 stderr");
	assert!(stderr.contains("vocabulary stage failed"), "stderr: {stderr}");
	assert!(stderr.contains("corpus contains no tokens"), "stderr: {stderr}");
}

#[test]
fn held_out_unknown_tokens_need_a_bucket() {
	let workspace = temp_workspace();
	let train = write_corpus(&workspace, "train.txt", "a b c\nc b a\n");
	let eval = write_corpus(&workspace, "eval.txt", "a z c\n");

	let output = lm_ppl()
		.args(["score", "--order", "2", "--no-stem", "--eval"])
		.arg(&eval)
		.arg(&train)
		.assert()
		.failure()
		.get_output()
		.stderr
		.clone();
	let stderr = String::from_utf8(output).expect("utf-8 stderr");
	assert!(stderr.contains("scoring stage failed"), "stderr: {stderr}");
	assert!(stderr.contains("unknown token \"z\""), "stderr: {stderr}");

	let stdout = stdout_of(
		lm_ppl()
			.args(["score", "--order", "2", "--no-stem", "--oov", "bucket", "--eval"])
			.arg(&eval)
			.arg(&train),
	);
	assert!(stdout.starts_with("sentence\ttokens\tperplexity\n0\t3\t"));
	assert!(stdout.contains("bigram mean perplexity"));
}

#[test]
fn score_skips_blank_lines() {
	let workspace = temp_workspace();
	let corpus = write_corpus(&workspace, "lines.txt", "a a a a\n\na a\n");

	let stdout = stdout_of(
		lm_ppl()
			.args(["score", "--order", "2", "--ngram-smoothing", "unsmoothed", "--no-stem"])
			.arg(&corpus),
	);
	let rows: Vec<&str> = stdout.lines().collect();
	assert_eq!(rows[1], "0\t4\t1.0000");
	assert!(rows[2].starts_with("2\t2\t"));
	assert!(stdout.contains("(2 scored, 1 skipped)"));
}

#[test]
fn vocab_lists_most_frequent_stems() {
	let workspace = temp_workspace();
	let corpus = write_corpus(&workspace, "words.txt", "Running cats run\nthe cat runs\n");

	let stdout = stdout_of(lm_ppl().args(["vocab", "--top", "2"]).arg(&corpus));
	assert!(stdout.contains("V = 3"));
	assert!(stdout.contains("tokens = 6"));
	assert!(stdout.contains("0\t3\trun"));
	assert!(stdout.contains("1\t2\tcat"));
}

#[test]
fn holdout_that_leaves_nothing_to_evaluate_is_rejected() {
	let workspace = temp_workspace();
	let corpus = write_corpus(&workspace, "small.txt", "a b\nb a\na b\nb a\n");

	let output = lm_ppl()
		.args(["compare", "--no-stem", "--holdout", "0.1"])
		.arg(&corpus)
		.assert()
		.failure()
		.get_output()
		.stderr
		.clone();
	let stderr = String::from_utf8(output).expect("utf-8 stderr");
	assert!(stderr.contains("holdout ratio 0.1"), "stderr: {stderr}");
	assert!(!stderr.contains("corpus contains no tokens"), "stderr: {stderr}");
}

#[test]
fn holdout_evaluates_on_the_split_off_sentences() {
	let workspace = temp_workspace();
	let corpus = write_corpus(&workspace, "small.txt", "a b\nb a\na b\nb a\n");

	let stdout = stdout_of(
		lm_ppl()
			.args(["compare", "--no-stem", "--orders", "2", "--holdout", "0.5", "--seed", "3"])
			.arg(&corpus),
	);
	assert!(stdout.contains("(evaluated on small.heldout)"), "stdout: {stdout}");
	assert!(stdout.contains("bigram"));
}
