use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::{tempdir, NamedTempFile};

const FLICKR_ENV: [&str; 4] = [
    "FLICKR_CONSUMER_KEY",
    "FLICKR_CONSUMER_SECRET",
    "FLICKR_ACCESS_KEY",
    "FLICKR_ACCESS_SECRET",
];

/// A `flickr-cli` command with no Flickr credentials leaking in from the environment.
fn flickr_cli() -> Command {
    let mut cmd = Command::cargo_bin("flickr-cli").expect("Binary exists");
    for key in FLICKR_ENV {
        cmd.env_remove(key);
    }
    cmd
}

/// Config with consumer credentials but no access token.
fn create_consumer_only_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"consumer_key: abc123\nconsumer_secret: def456\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_commands() {
    flickr_cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("download-user")
                .and(predicate::str::contains("download-album"))
                .and(predicate::str::contains("checksums"))
                .and(predicate::str::contains("duplicates"))
                .and(predicate::str::contains("upload"))
                .and(predicate::str::contains("auth")),
        );
}

#[test]
fn download_help_names_bundled_templates() {
    flickr_cli()
        .args(["download-user", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("archive, latex"));
}

#[test]
fn unsupported_hash_fails_before_loading_config() {
    flickr_cli()
        .args(["checksums", "--hash", "crc32", "--config", "does-not-exist.yml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported hash algorithm"));
}

#[test]
fn invalid_album_id_exits_with_error() {
    flickr_cli()
        .args(["download-album", "--album", "abc", "--config", "does-not-exist.yml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid album ID"));
}

#[test]
fn invalid_date_exits_with_error() {
    flickr_cli()
        .args([
            "download-user",
            "--min-upload-date",
            "last tuesday",
            "--config",
            "does-not-exist.yml",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid date"));
}

#[test]
fn missing_upload_source_exits_with_error() {
    let dir = tempdir().unwrap();
    let config = create_consumer_only_config();
    flickr_cli()
        .arg("upload")
        .arg(dir.path().join("nothing-here"))
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn missing_config_file_exits_with_error() {
    let dir = tempdir().unwrap();
    flickr_cli()
        .arg("duplicates")
        .arg("--config")
        .arg(dir.path().join("config.yml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn missing_access_token_points_to_auth() {
    let config = create_consumer_only_config();
    flickr_cli()
        .arg("checksums")
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("flickr-cli auth"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use flickr_cli::cli::{run, Cli, Commands};

    let cli = Cli {
        config: std::path::PathBuf::from("dummy.yaml"),
        verbose: false,
        command: Commands::Duplicates,
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy config must not load");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
