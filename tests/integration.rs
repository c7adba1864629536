//! End-to-end tests driving a real local git repository.
//!
//! Each test builds a throwaway repository with tagged commits, then runs
//! discovery / install / remove against it through the library surface.
//! Tests skip quietly when `git` is not installed.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;

use modfetch::config::{Config, DbConfig, InstallConfig, NotifyConfig};
use modfetch::error::Error;
use modfetch::install::{Installer, PathLocks};
use modfetch::models::SnapshotStatus;
use modfetch::runner::CommandRunner;
use modfetch::service::{InstallRequest, Service};
use modfetch::tags;
use modfetch::validate::RepoUrl;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .is_ok_and(|ok| ok)
}

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args([
            "-c",
            "user.name=modfetch-test",
            "-c",
            "user.email=test@example.com",
        ])
        .args(args)
        .status()
        .expect("run git");
    assert!(status.success(), "git {args:?} failed");
}

/// Create a repository with two tagged releases, `v1.0` and `v1.1`.
fn make_tagged_repo(parent: &Path) -> PathBuf {
    let repo = parent.join("upstream.git-src");
    std::fs::create_dir_all(&repo).unwrap();

    let init = Command::new("git")
        .args(["init", "-q"])
        .current_dir(&repo)
        .status()
        .expect("run git init");
    assert!(init.success());

    std::fs::write(repo.join("__manifest__.py"), "{'name': 'web'}\n").unwrap();
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "-q", "-m", "first release"]);
    git(&repo, &["tag", "v1.0"]);

    std::fs::write(repo.join("models.py"), "# second release\n").unwrap();
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "-q", "-m", "second release"]);
    git(&repo, &["tag", "v1.1"]);

    repo
}

fn file_url(repo: &Path) -> RepoUrl {
    RepoUrl::trusted(&format!("file://{}", repo.display())).unwrap()
}

fn config_for(dest: &Path) -> Config {
    Config {
        db: DbConfig {
            path: PathBuf::from(":memory:"),
        },
        install: InstallConfig {
            destination_base: dest.to_path_buf(),
            timeout_secs: 60,
        },
        ownership: None,
        notify: NotifyConfig::default(),
    }
}

async fn service_for(dest: &Path) -> Service {
    let pool = modfetch::db::connect_memory().await.unwrap();
    modfetch::migrate::apply_schema(&pool).await.unwrap();
    Service::with_pool(config_for(dest), pool)
}

fn request(url: RepoUrl, tag: &str) -> InstallRequest {
    InstallRequest {
        url,
        tag: tag.to_string(),
        desired_name: None,
        destination_base: None,
        update_module_list: false,
        restart: false,
    }
}

#[tokio::test]
async fn discovers_both_tags_in_remote_order() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let runner = CommandRunner::new(Duration::from_secs(60));

    let discovered = tags::list_tags(&file_url(&repo), &runner).await.unwrap();
    let names: Vec<&str> = discovered.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["v1.0", "v1.1"]);
    assert!(discovered.iter().all(|t| t.commit.is_some()));
}

#[tokio::test]
async fn installs_tag_with_deterministic_naming() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");
    let service = service_for(&dest).await;

    let report = service
        .install(request(file_url(&repo), "v1.1"))
        .await
        .unwrap();

    let snap = &report.snapshot;
    assert_eq!(snap.module_name, "upstream.git-src");
    assert!(snap.path.ends_with("upstream.git-src_v1.1"));
    assert!(snap.path.exists());
    // The payload of the tagged commit is materialized.
    assert!(snap.path.join("models.py").exists());
    assert_eq!(snap.status, SnapshotStatus::Active);
    assert!(report.warnings.is_empty());

    // The ledger recorded exactly this install.
    let recorded = service.snapshots().await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].tag, "v1.1");
}

#[tokio::test]
async fn different_tags_get_distinct_paths() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");
    let service = service_for(&dest).await;

    let first = service
        .install(request(file_url(&repo), "v1.0"))
        .await
        .unwrap();
    let second = service
        .install(request(file_url(&repo), "v1.1"))
        .await
        .unwrap();

    assert_ne!(first.snapshot.path, second.snapshot.path);
    assert!(first.snapshot.path.exists());
    assert!(second.snapshot.path.exists());
    // v1.0 predates models.py.
    assert!(!first.snapshot.path.join("models.py").exists());
}

#[tokio::test]
async fn reinstalling_same_tag_is_a_collision() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");
    let service = service_for(&dest).await;

    service
        .install(request(file_url(&repo), "v1.0"))
        .await
        .unwrap();
    let err = service
        .install(request(file_url(&repo), "v1.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PathCollision(_)));
}

#[tokio::test]
async fn reinstall_after_remove_reclaims_the_path() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");
    let service = service_for(&dest).await;

    let first = service
        .install(request(file_url(&repo), "v1.0"))
        .await
        .unwrap();
    let removed = service.remove(&first.snapshot.id).await.unwrap();
    assert_eq!(removed.status, SnapshotStatus::Removed);
    assert!(!first.snapshot.path.exists());

    // Same tag, same deterministic path; the removed row is history, not
    // a claim on the path.
    let second = service
        .install(request(file_url(&repo), "v1.0"))
        .await
        .unwrap();
    assert_eq!(second.snapshot.path, first.snapshot.path);
    assert!(second.snapshot.path.join("__manifest__.py").exists());

    let active: Vec<_> = service
        .snapshots()
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.status == SnapshotStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.snapshot.id);
}

#[tokio::test]
async fn failed_ledger_write_discards_install_directory() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");

    let pool = modfetch::db::connect_memory().await.unwrap();
    modfetch::migrate::apply_schema(&pool).await.unwrap();
    // Make every snapshot insert fail after the clone succeeds.
    sqlx::query(
        "CREATE TRIGGER snapshots_read_only BEFORE INSERT ON snapshots
         BEGIN SELECT RAISE(ABORT, 'snapshots table is read only'); END",
    )
    .execute(&pool)
    .await
    .unwrap();
    let service = Service::with_pool(config_for(&dest), pool);

    let err = service
        .install(request(file_url(&repo), "v1.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Db(_)));

    // The cloned directory must not survive an untracked install.
    assert!(!dest.join("upstream.git-src_v1.0").exists());
    assert!(service.snapshots().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_installs_for_same_path_never_double_install() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");
    let installer = Installer::new(
        CommandRunner::new(Duration::from_secs(60)),
        PathLocks::new(),
    );
    let url = file_url(&repo);

    let (a, b) = tokio::join!(
        installer.install(&url, "v1.0", &dest, None),
        installer.install(&url, "v1.0", &dest, None),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one install may win");
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(err, Error::PathCollision(_)));
        }
    }
}

#[tokio::test]
async fn timed_out_fetch_leaves_no_partial_directory() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");
    std::fs::create_dir_all(&dest).unwrap();

    // A 1ms budget cannot complete a clone.
    let installer = Installer::new(
        CommandRunner::new(Duration::from_millis(1)),
        PathLocks::new(),
    );
    let err = installer
        .install(&file_url(&repo), "v1.0", &dest, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommandTimedOut { .. }));

    let leftovers: Vec<_> = std::fs::read_dir(&dest).unwrap().collect();
    assert!(leftovers.is_empty(), "no staging or target may remain");
}

#[tokio::test]
async fn remove_deletes_directory_and_second_remove_fails() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");
    let service = service_for(&dest).await;

    let report = service
        .install(request(file_url(&repo), "v1.0"))
        .await
        .unwrap();
    let id = report.snapshot.id.clone();
    assert!(report.snapshot.path.exists());

    let removed = service.remove(&id).await.unwrap();
    assert_eq!(removed.status, SnapshotStatus::Removed);
    assert!(!removed.path.exists());

    let err = service.remove(&id).await.unwrap_err();
    assert!(matches!(err, Error::SnapshotNotActive(_)));
}

#[tokio::test]
async fn install_with_desired_name_and_hooks() {
    if !git_available() {
        return;
    }
    let scratch = TempDir::new().unwrap();
    let repo = make_tagged_repo(scratch.path());
    let dest = scratch.path().join("addons");

    let pool = modfetch::db::connect_memory().await.unwrap();
    modfetch::migrate::apply_schema(&pool).await.unwrap();
    let config = Config {
        db: DbConfig {
            path: PathBuf::from(":memory:"),
        },
        install: InstallConfig {
            destination_base: dest.clone(),
            timeout_secs: 60,
        },
        ownership: None,
        notify: NotifyConfig {
            // The refresh hook succeeds; the restart hook fails and must
            // surface as a warning, not an error.
            refresh_command: Some(vec!["true".to_string()]),
            restart_command: Some(vec!["false".to_string()]),
        },
    };
    let service = Service::with_pool(config, pool);

    let report = service
        .install(InstallRequest {
            url: file_url(&repo),
            tag: "v1.1".to_string(),
            desired_name: Some("web".to_string()),
            destination_base: None,
            update_module_list: true,
            restart: true,
        })
        .await
        .unwrap();

    assert!(report.snapshot.path.ends_with("web_v1.1"));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("restart"));
}
