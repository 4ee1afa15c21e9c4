// ABOUTME: Handlebars templates for confirmation, password reset and notification mails
// ABOUTME: Built-in defaults can be replaced through MAIL_<KIND>_SUBJECT/_TEMPLATE_TXT_HBS/_TEMPLATE_HTML_HBS
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use std::env;

use handlebars::{no_escape, Handlebars};
use recipe_core::errors::{AppError, AppResult};
use serde::Serialize;

use super::EmailMessage;

/// Message kinds sent by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    /// Account confirmation key for a new user
    Confirm,
    /// Password reset key
    Reset,
    /// Digest of recently created recipes
    Notification,
}

impl EmailKind {
    const ALL: [Self; 3] = [Self::Confirm, Self::Reset, Self::Notification];

    const fn name(self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Reset => "reset",
            Self::Notification => "notification",
        }
    }

    const fn env_prefix(self) -> &'static str {
        match self {
            Self::Confirm => "MAIL_CONFIRM",
            Self::Reset => "MAIL_RESET",
            Self::Notification => "MAIL_NOTIFICATION",
        }
    }

    const fn defaults(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Confirm => (
                "Confirm your Recipes account",
                "Hello {{fullName}},\n\nyour account {{username}} was created. \
                 Confirm it here:\n{{url}}/confirm?username={{username}}&key={{key}}\n",
                "<p>Hello {{fullName}},</p><p>your account <b>{{username}}</b> was created. \
                 <a href=\"{{url}}/confirm?username={{username}}&key={{key}}\">Confirm it here</a>.</p>",
            ),
            Self::Reset => (
                "Reset your Recipes password",
                "Hello {{fullName}},\n\nset a new password for {{username}} here:\n\
                 {{url}}/reset?username={{username}}&key={{key}}\n",
                "<p>Hello {{fullName}},</p><p><a href=\"{{url}}/reset?username={{username}}&key={{key}}\">\
                 Set a new password</a> for <b>{{username}}</b>.</p>",
            ),
            Self::Notification => (
                "New recipes",
                "Hello {{fullName}},\n\nnew recipes were added:\n\
                 {{#each recipes}}- {{name}}: {{../url}}/recipe/{{id}}\n{{/each}}",
                "<p>Hello {{fullName}},</p><p>new recipes were added:</p><ul>\
                 {{#each recipes}}<li><a href=\"{{../url}}/recipe/{{id}}\">{{name}}</a></li>{{/each}}</ul>",
            ),
        }
    }
}

/// Recipe entry in a notification digest
#[derive(Debug, Clone, Serialize)]
pub struct RecipeLink {
    /// Recipe id
    pub id: i64,
    /// Recipe name
    pub name: String,
}

/// Values available inside every template
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailContext {
    /// Public URL of the web client
    pub url: String,
    /// Recipient's username
    pub username: String,
    /// Confirmation or reset key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Recipes announced by a digest
    pub recipes: Vec<RecipeLink>,
    /// Recipient's first name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// First and last name, or the username when either is missing
    pub full_name: String,
}

impl EmailContext {
    /// Context for a recipient
    #[must_use]
    pub fn new(
        url: &str,
        username: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Self {
        let full_name = match (first_name, last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            _ => username.to_owned(),
        };
        Self {
            url: url.trim_end_matches('/').to_owned(),
            username: username.to_owned(),
            key: None,
            recipes: Vec::new(),
            first_name: first_name.map(str::to_owned),
            full_name,
        }
    }

    /// Attach a confirmation or reset key
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach the recipes of a digest
    #[must_use]
    pub fn with_recipes(mut self, recipes: Vec<RecipeLink>) -> Self {
        self.recipes = recipes;
        self
    }
}

/// Compiled templates for every [`EmailKind`]
///
/// Subjects and text bodies are rendered without HTML escaping.
pub struct EmailTemplates {
    plain: Handlebars<'static>,
    html: Handlebars<'static>,
}

impl EmailTemplates {
    /// Compile the built-in templates, overridden by environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a template does not compile
    pub fn from_env() -> AppResult<Self> {
        Self::build(|key| env::var(key).ok().filter(|value| !value.trim().is_empty()))
    }

    /// Compile the built-in templates only
    ///
    /// # Errors
    ///
    /// Returns an error if a template does not compile
    pub fn builtin() -> AppResult<Self> {
        Self::build(|_| None)
    }

    fn build(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut plain = Handlebars::new();
        plain.register_escape_fn(no_escape);
        let mut html = Handlebars::new();

        for kind in EmailKind::ALL {
            let (subject, text, body) = kind.defaults();
            let prefix = kind.env_prefix();
            let subject = lookup(&format!("{prefix}_SUBJECT")).unwrap_or_else(|| subject.to_owned());
            let text = lookup(&format!("{prefix}_TEMPLATE_TXT_HBS"))
                .unwrap_or_else(|| text.to_owned());
            let body = lookup(&format!("{prefix}_TEMPLATE_HTML_HBS"))
                .unwrap_or_else(|| body.to_owned());

            let register = |registry: &mut Handlebars<'static>, suffix: &str, source: &str| {
                let name = format!("{}_{suffix}", kind.name());
                registry
                    .register_template_string(&name, source)
                    .map_err(|e| AppError::internal(format!("Invalid {name} mail template: {e}")))
            };
            register(&mut plain, "subject", &subject)?;
            register(&mut plain, "txt", &text)?;
            register(&mut html, "html", &body)?;
        }

        Ok(Self { plain, html })
    }

    /// Render a message for `to`
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails
    pub fn render(
        &self,
        kind: EmailKind,
        to: &str,
        context: &EmailContext,
    ) -> AppResult<EmailMessage> {
        let name = kind.name();
        let render_error =
            |e: handlebars::RenderError| AppError::internal(format!("Failed to render {name} mail: {e}"));

        Ok(EmailMessage {
            to: to.to_owned(),
            subject: self
                .plain
                .render(&format!("{name}_subject"), context)
                .map_err(render_error)?
                .trim()
                .to_owned(),
            text: self
                .plain
                .render(&format!("{name}_txt"), context)
                .map_err(render_error)?,
            html: self
                .html
                .render(&format!("{name}_html"), context)
                .map_err(render_error)?,
        })
    }
}
