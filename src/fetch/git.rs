//! `git://` sources.
//!
//! A git source names a file inside a repository. The part of the path
//! after a `//` separator is the file within the repository:
//!
//! ```text
//! git://github.com/org/infra.git//clusters/prod/helmfile.yaml?ref=v1.2.0
//! ```
//!
//! Without a separator the last path segment is the file and the rest is the
//! repository. `ref` selects a branch or tag, `depth` makes a shallow clone.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::{take_query_param, FetchError, Getter, Request};
use crate::process::{CommandRunner, CommandSpec};

/// A file inside a git repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    /// Repository URL passed to `git clone`
    pub repository: String,
    /// Path of the file relative to the repository root
    pub file: PathBuf,
    /// Branch or tag to check out
    pub reference: Option<String>,
    /// Shallow clone depth
    pub depth: Option<u32>,
}

impl GitSource {
    /// Split a git URL into repository, file path and clone options.
    pub fn parse(source: &Url) -> Result<Self, FetchError> {
        let invalid = |message: &str| FetchError::InvalidSource {
            url: source.to_string(),
            message: message.to_string(),
        };

        let mut url = source.clone();
        let reference = take_query_param(&mut url, "ref").filter(|r| !r.is_empty());
        let depth = take_query_param(&mut url, "depth")
            .map(|d| d.parse::<u32>())
            .transpose()
            .map_err(|_| invalid("depth must be an integer"))?;

        let path = url.path().to_string();
        let (repo_path, file) = match path.split_once("//") {
            Some((repo, file)) => (repo.to_string(), file.to_string()),
            None => match path.rsplit_once('/') {
                Some((repo, file)) => (repo.to_string(), file.to_string()),
                None => (String::new(), path.clone()),
            },
        };

        if repo_path.trim_matches('/').is_empty() {
            return Err(invalid("no repository path"));
        }
        if file.is_empty() {
            return Err(invalid("no file path inside the repository"));
        }
        let file = urlencoding::decode(&file)
            .map_err(|_| invalid("file path is not valid UTF-8"))?
            .into_owned();

        url.set_path(&repo_path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            repository: url.to_string(),
            file: PathBuf::from(file),
            reference,
            depth,
        })
    }

    fn clone_command(&self, target: &Path) -> CommandSpec {
        let mut cmd = CommandSpec::new("git").arg("clone");
        if let Some(depth) = self.depth {
            cmd = cmd.arg("--depth").arg(depth.to_string());
        }
        if let Some(reference) = &self.reference {
            cmd = cmd.arg("--branch").arg(reference.as_str());
        }
        cmd.arg("--")
            .arg(self.repository.as_str())
            .arg(target.to_string_lossy())
    }
}

/// Clones a repository into a scratch directory and copies one file out.
#[derive(Clone)]
pub struct GitGetter {
    runner: Arc<dyn CommandRunner>,
}

impl GitGetter {
    /// Create a getter that runs `git` through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Getter for GitGetter {
    async fn get_file(&self, request: &Request) -> Result<(), FetchError> {
        let source = GitSource::parse(&request.source)?;

        let scratch = tempfile::tempdir().map_err(|e| FetchError::io(std::env::temp_dir(), e))?;
        let checkout = scratch.path().join("checkout");

        debug!(repository = %source.repository, file = %source.file.display(), "Cloning manifest repository");
        let output = self.runner.run(source.clone_command(&checkout)).await?;
        if !output.success {
            return Err(FetchError::Git {
                repository: source.repository,
                message: output.output_lossy().trim().to_string(),
            });
        }

        let file = checkout.join(&source.file);
        if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Err(FetchError::Git {
                repository: source.repository,
                message: format!("'{}' not found in repository", source.file.display()),
            });
        }

        tokio::fs::copy(&file, &request.destination)
            .await
            .map_err(|e| FetchError::io(&file, e))?;

        Ok(())
    }
}
