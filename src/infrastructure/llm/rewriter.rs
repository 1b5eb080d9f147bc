//! Rewrite-service adapter: prompts the messages API to remove smells
//! from a test class or to repair build errors.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::client::MessagesClient;
use crate::domain::models::{ArtifactSet, TestArtifact};
use crate::domain::ports::{RewriteError, TestRewriter};

const SYSTEM_PROMPT: &str = "\
You are an expert Java QA engineer. You refactor generated JUnit test \
classes so they stay functionally identical while the named quality \
issues are removed. Keep imports, annotations and class names unless a \
fix requires renaming. Keep the JUnit version already in use. When you \
replace literals, introduce well-named constants, and keep each \
assertion atomic with a clear message. Respond with valid Java source \
only.";

const FIX_SYSTEM_PROMPT: &str = "\
You are an expert Java build engineer. You repair generated JUnit test \
classes that fail to compile or run, changing as little as possible and \
never altering what the tests verify. Respond with valid Java source \
only.";

/// Prompt style: with per-smell fix checklists, or bare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Guided,
    ZeroShot,
}

impl FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guided" => Ok(Self::Guided),
            "zeroshot" => Ok(Self::ZeroShot),
            other => Err(format!("unknown prompt mode: {other}")),
        }
    }
}

/// Turn detector-style smell names into the human-readable form used in
/// guide headings: underscores become spaces, CamelCase is split, words
/// are title-cased. Names already containing spaces pass through.
fn prettify_smell(name: &str) -> String {
    if name.contains(' ') {
        return name.trim().to_string();
    }

    let mut spaced = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.replace('_', " ").chars() {
        if c.is_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        spaced.push(c);
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a smell name for matching across naming styles
/// (`Empty_Test`, `EmptyTest`, `Empty Test` all compare equal).
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect::<String>()
        .to_lowercase()
}

/// Split a concatenated guide document into one block per `## ` heading.
fn split_guide_blocks(guide: &str) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    for line in guide.lines() {
        if line.starts_with("## ") || blocks.is_empty() {
            blocks.push(String::new());
        }
        if let Some(block) = blocks.last_mut() {
            if !block.is_empty() {
                block.push('\n');
            }
            block.push_str(line);
        }
    }
    blocks.retain(|b| !b.trim().is_empty());
    blocks
}

/// Keep only guide blocks whose heading names one of the smells.
fn select_guides(guide: &str, smells: &[String]) -> String {
    let wanted: Vec<String> = smells.iter().map(|s| normalize(s)).collect();
    split_guide_blocks(guide)
        .into_iter()
        .filter(|block| {
            block
                .lines()
                .next()
                .map(|heading| wanted.contains(&normalize(heading.trim_start_matches('#'))))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Strip markdown fences the service sometimes wraps output in; returns
/// `None` when nothing usable remains.
fn clean_source_output(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the fence line (possibly "```java") and the closing fence.
        text = rest.split_once('\n').map_or("", |(_, body)| body);
        text = text.strip_suffix("```").unwrap_or(text).trim_end();
    }
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Artifacts the diagnostic mentions by file stem; empty when
/// attribution is ambiguous.
fn implicated_targets(artifacts: &ArtifactSet, diagnostic: &str) -> Vec<String> {
    artifacts
        .iter()
        .filter(|a| {
            let stem = a.file_name().strip_suffix(".java").unwrap_or(a.file_name());
            diagnostic.contains(stem)
        })
        .map(|a| a.target().to_string())
        .collect()
}

/// Rewrites tests through the messages API.
pub struct ApiRewriter {
    client: MessagesClient,
    mode: PromptMode,
    guides_dir: PathBuf,
}

impl ApiRewriter {
    pub fn new(client: MessagesClient, mode: PromptMode, guides_dir: PathBuf) -> Self {
        Self {
            client,
            mode,
            guides_dir,
        }
    }

    /// Concatenate all guide files, with every smell's first heading
    /// normalized to level 2 and internal level-2 headings demoted, so
    /// the document splits cleanly by smell.
    fn load_guides(&self) -> std::io::Result<String> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(&self.guides_dir) {
            Ok(dir) => dir
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
                .collect(),
            Err(_) => Vec::new(),
        };
        entries.sort();

        let mut parts = Vec::new();
        for path in entries {
            let text = std::fs::read_to_string(&path)?;
            let mut lines: Vec<String> = text
                .lines()
                .skip_while(|l| l.trim().is_empty())
                .map(String::from)
                .collect();

            if let Some(first) = lines.first_mut() {
                if first.starts_with('#') {
                    let heading = first.trim_start_matches('#').trim().to_string();
                    *first = format!("## {heading}");
                } else {
                    let heading = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("Smell")
                        .replace('_', " ");
                    lines.insert(0, format!("## {}", prettify_smell(&heading)));
                }
            }

            for line in lines.iter_mut().skip(1) {
                if line.starts_with("## ") {
                    *line = format!("#{line}");
                }
            }

            parts.push(lines.join("\n"));
        }
        Ok(parts.join("\n\n"))
    }

    fn smell_listing(smells: &[String]) -> String {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for smell in smells {
            *counts.entry(prettify_smell(smell)).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(name, n)| {
                if n > 1 {
                    format!("{name} (x{n})")
                } else {
                    name
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn rewrite_prompt(&self, artifact: &TestArtifact, smells: &[String], guide: &str) -> String {
        let mut prompt = format!(
            "Below is the full content of the Java test class {name}.\n\n\
             ```java\n{source}\n```\n\n\
             Static analysis reports these test smells in it:\n{listing}\n",
            name = artifact.file_name(),
            source = artifact.source(),
            listing = Self::smell_listing(smells),
        );
        if !guide.is_empty() {
            prompt.push_str(
                "\nApply every relevant item from these fix checklists while \
                 preserving behaviour and coverage:\n\n",
            );
            prompt.push_str(guide);
            prompt.push('\n');
        }
        prompt.push_str(
            "\nReturn ONLY the final Java source code, with no explanation, \
             commentary or markdown fences.",
        );
        prompt
    }

    fn fix_prompt(artifact: &TestArtifact, diagnostic: &str) -> String {
        format!(
            "The Java test class {name} fails to build. Full source:\n\n\
             ```java\n{source}\n```\n\n\
             Build output:\n\n```\n{diagnostic}\n```\n\n\
             Repair the class so it compiles and runs. Return ONLY the final \
             Java source code, with no explanation, commentary or markdown \
             fences.",
            name = artifact.file_name(),
            source = artifact.source(),
        )
    }
}

#[async_trait]
impl TestRewriter for ApiRewriter {
    async fn rewrite(
        &self,
        artifact: &TestArtifact,
        smells: &[String],
    ) -> Result<String, RewriteError> {
        if smells.is_empty() {
            return Ok(artifact.source().to_string());
        }

        let guide = match self.mode {
            PromptMode::Guided => {
                let all = self.load_guides()?;
                select_guides(&all, smells)
            }
            PromptMode::ZeroShot => String::new(),
        };

        info!(target_class = artifact.target(), "rewriting test class");
        let prompt = self.rewrite_prompt(artifact, smells, &guide);
        let raw = self
            .client
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| RewriteError::Service(e.to_string()))?;

        clean_source_output(&raw)
            .ok_or_else(|| RewriteError::UnusableOutput(artifact.target().to_string()))
    }

    async fn fix_errors(
        &self,
        artifacts: &ArtifactSet,
        diagnostic: &str,
    ) -> Result<BTreeMap<String, String>, RewriteError> {
        let mut targets = implicated_targets(artifacts, diagnostic);
        if targets.is_empty() {
            debug!("diagnostic names no artifact, fixing the whole set");
            targets = artifacts.iter().map(|a| a.target().to_string()).collect();
        }

        let mut fixes = BTreeMap::new();
        let mut last_error = None;
        for target in targets {
            let Some(artifact) = artifacts.get(&target) else {
                continue;
            };
            info!(target_class = %target, "requesting build-error fix");
            let prompt = Self::fix_prompt(artifact, diagnostic);
            match self.client.complete(FIX_SYSTEM_PROMPT, &prompt).await {
                Ok(raw) => match clean_source_output(&raw) {
                    Some(source) => {
                        fixes.insert(target, source);
                    }
                    None => {
                        warn!(target_class = %target, "fix produced unusable output, skipping");
                        last_error = Some(RewriteError::UnusableOutput(target));
                    }
                },
                Err(err) => {
                    warn!(target_class = %target, error = %err, "fix request failed, skipping");
                    last_error = Some(RewriteError::Service(err.to_string()));
                }
            }
        }

        if fixes.is_empty() {
            if let Some(err) = last_error {
                return Err(err);
            }
        }
        Ok(fixes)
    }
}
