//! Session init file templates.
//!
//! Templates use `{{name}}` placeholders. Substituted values are never
//! scanned again, so braces inside a user's rc file are left alone.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::dialect::ShellDialect;
use crate::{Result, ShellError};

const POSIX_TEMPLATE: &str = r#"# Generated by inkube for this session. Removed when the shell exits.
{{original_init}}
INKUBE_PROJECT_ROOT={{project_dir}}
export INKUBE_PROJECT_ROOT
INKUBE_SESSION_START={{session_start}}
export INKUBE_SESSION_START
{{history}}
PS1="(inkube) ${PS1-}"
"#;

// fish reads its own config.fish even when started with -C, so the original
// content is not repeated here.
const FISH_TEMPLATE: &str = r#"# Generated by inkube for this session. Removed when the shell exits.
# User config: {{original_init_path}}
set -gx INKUBE_PROJECT_ROOT {{project_dir}}
set -gx INKUBE_SESSION_START {{session_start}}
{{history}}
if functions -q fish_prompt
    functions -c fish_prompt __inkube_user_prompt
    function fish_prompt
        printf '(inkube) '
        __inkube_user_prompt
    end
end
"#;

/// Which init syntax to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Posix,
    Fish,
}

/// Values embedded into a rendered init file.
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
    pub project_dir: &'a Path,
    /// Prior rc content; empty when missing or unreadable.
    pub original_init: &'a str,
    pub original_init_path: Option<&'a Path>,
    pub history_file: Option<&'a Path>,
    pub session_start: DateTime<Utc>,
}

impl Template {
    pub fn for_dialect(dialect: ShellDialect) -> Self {
        if dialect.uses_fish_syntax() {
            Template::Fish
        } else {
            Template::Posix
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Template::Posix => POSIX_TEMPLATE,
            Template::Fish => FISH_TEMPLATE,
        }
    }

    /// Render the init file for `ctx`.
    pub fn render(&self, ctx: &TemplateContext<'_>) -> Result<String> {
        let mut values = BTreeMap::new();
        values.insert("project_dir", quote(&ctx.project_dir.to_string_lossy())?);
        values.insert("session_start", ctx.session_start.timestamp().to_string());
        values.insert(
            "original_init_path",
            ctx.original_init_path.map(comment_safe).unwrap_or_default(),
        );
        values.insert("original_init", self.original_init_section(ctx));
        values.insert("history", self.history_section(ctx.history_file)?);
        substitute(self.source(), &values)
    }

    fn original_init_section(&self, ctx: &TemplateContext<'_>) -> String {
        let content = ctx.original_init.trim();
        if content.is_empty() {
            return String::new();
        }
        let path = ctx.original_init_path.map(comment_safe).unwrap_or_default();
        format!("# Begin {path}\n{content}\n# End {path}\n")
    }

    fn history_section(&self, history_file: Option<&Path>) -> Result<String> {
        let Some(file) = history_file else {
            return Ok(String::new());
        };
        let quoted = quote(file.to_string_lossy().trim())?;
        Ok(match self {
            Template::Posix => format!("HISTFILE={quoted}\nexport HISTFILE"),
            Template::Fish => format!("set -gx HISTFILE {quoted}"),
        })
    }
}

fn quote(value: &str) -> Result<String> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .map_err(|e| ShellError::TemplateRenderFailed(format!("cannot quote {value:?}: {e}")))
}

fn comment_safe(path: &Path) -> String {
    path.to_string_lossy().replace(['\n', '\r'], " ")
}

/// Replace every `{{name}}` in `template`; an unknown name is an error.
fn substitute(template: &str, values: &BTreeMap<&str, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| ShellError::TemplateRenderFailed("unterminated placeholder".into()))?;
        let name = after[..end].trim();
        let value = values.get(name).ok_or_else(|| {
            ShellError::TemplateRenderFailed(format!("unknown placeholder `{name}`"))
        })?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}
