//! Runs the real `git` binary against local repositories. Skipped when git
//! is not installed.

use gitup::{CliGit, GitSync, SyncRequest};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=gitup", "-c", "user.email=gitup@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
        .status;
    assert!(status.success(), "git {args:?} failed");
}

/// Creates an upstream repository with one commit.
fn upstream(root: &TempDir) -> String {
    let dir = root.path().join("upstream");
    std::fs::create_dir_all(&dir).unwrap();
    git(&dir, &["init", "--quiet"]);
    git(&dir, &["commit", "--quiet", "--allow-empty", "-m", "init"]);
    dir.display().to_string()
}

fn rev_parse(dir: &Path) -> String {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn request(url: &str, work_dir: &Path, bare: bool) -> SyncRequest {
    SyncRequest {
        url: url.to_string(),
        work_dir: work_dir.to_path_buf(),
        bare,
        token: Some("unused-for-local-paths".into()),
    }
}

#[tokio::test]
async fn bare_sync_is_idempotent() {
    if !git_available() {
        return;
    }
    let root = TempDir::new().unwrap();
    let url = upstream(&root);
    let request = request(&url, &root.path().join("work/teamA/svc"), true);
    let cli = CliGit::new();

    assert!(cli.sync(&request).await.unwrap());
    assert!(request.work_dir.join("HEAD").exists());

    assert!(!cli.sync(&request).await.unwrap());
    assert!(!cli.sync(&request).await.unwrap());
}

#[tokio::test]
async fn bare_sync_picks_up_new_commits() {
    if !git_available() {
        return;
    }
    let root = TempDir::new().unwrap();
    let url = upstream(&root);
    let request = request(&url, &root.path().join("mirror.git"), true);
    let cli = CliGit::new();
    cli.sync(&request).await.unwrap();

    git(Path::new(&url), &["commit", "--quiet", "--allow-empty", "-m", "next"]);

    assert!(cli.sync(&request).await.unwrap());
    assert!(!cli.sync(&request).await.unwrap());
}

#[tokio::test]
async fn working_tree_sync_pulls_changes() {
    if !git_available() {
        return;
    }
    let root = TempDir::new().unwrap();
    let url = upstream(&root);
    let request = request(&url, &root.path().join("work/svc"), false);
    let cli = CliGit::new();

    assert!(cli.sync(&request).await.unwrap());
    assert!(request.work_dir.join(".git/HEAD").exists());
    assert!(!cli.sync(&request).await.unwrap());

    git(Path::new(&url), &["commit", "--quiet", "--allow-empty", "-m", "next"]);
    assert!(cli.sync(&request).await.unwrap());
}

#[tokio::test]
async fn working_tree_sync_follows_the_requested_url() {
    if !git_available() {
        return;
    }
    let root = TempDir::new().unwrap();
    let first = upstream(&root);
    let work_dir = root.path().join("work/svc");
    let cli = CliGit::new();
    assert!(cli.sync(&request(&first, &work_dir, false)).await.unwrap());

    // Same history plus one commit, reachable only through the new URL.
    let moved = root.path().join("moved");
    git(root.path(), &["clone", "--quiet", first.as_str(), "moved"]);
    git(&moved, &["commit", "--quiet", "--allow-empty", "-m", "moved"]);
    let moved_url = moved.display().to_string();

    assert!(cli.sync(&request(&moved_url, &work_dir, false)).await.unwrap());
    assert_eq!(rev_parse(&work_dir), rev_parse(&moved));
    assert!(!cli.sync(&request(&moved_url, &work_dir, false)).await.unwrap());
}

#[tokio::test]
async fn missing_remote_is_an_error() {
    if !git_available() {
        return;
    }
    let root = TempDir::new().unwrap();
    let missing = root.path().join("nowhere").display().to_string();
    let request = request(&missing, &root.path().join("work/x"), true);

    let result = CliGit::new().sync(&request).await;
    assert!(matches!(result, Err(gitup::GitError::Command { .. })));
}
