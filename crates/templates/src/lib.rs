// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Rendering of the emails carrying action links

use std::sync::Arc;

use authmail_data_model::LinkType;
use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::debug;

mod context;
mod defaults;

pub use self::context::EmailLinkContext;

/// Replacement for the built-in subject or body of one kind of email
#[derive(Debug, Clone, Default)]
pub struct TemplateOverride {
    /// Subject line, itself a template
    pub subject: Option<String>,

    /// Path to the body template
    pub body: Option<Utf8PathBuf>,
}

/// Wrapper around [`minijinja::Environment`] holding the subject and body
/// templates of each kind of email
#[derive(Debug, Clone)]
pub struct Templates {
    environment: Arc<minijinja::Environment<'static>>,
}

/// There was an issue while loading the templates
#[derive(Error, Debug)]
pub enum TemplateLoadingError {
    /// Failed to read a template file
    #[error("failed to read template {path:?}")]
    Read {
        /// The path of the template
        path: Utf8PathBuf,

        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// A template failed to compile
    #[error("could not compile template")]
    Compile(#[from] minijinja::Error),
}

/// Failed to render a template
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Missing template
    #[error("missing template {template:?}")]
    Missing {
        /// The name of the template being rendered
        template: String,

        /// The underlying error
        #[source]
        source: minijinja::Error,
    },

    /// Failed to render the template
    #[error("could not render template {template:?}")]
    Render {
        /// The name of the template being rendered
        template: String,

        /// The underlying error
        #[source]
        source: minijinja::Error,
    },
}

fn template_name(link_type: LinkType, part: &str) -> String {
    let kind = match link_type {
        LinkType::Invite => "invite",
        LinkType::Confirmation => "confirmation",
        LinkType::Recovery => "recovery",
        LinkType::EmailChange => "email_change",
    };

    // The `.html` extension turns on HTML auto-escaping for bodies
    format!("{kind}.{part}")
}

impl Templates {
    /// Load the built-in templates, replacing the ones given in `overrides`
    ///
    /// # Errors
    ///
    /// Returns an error if a template file could not be read or if a template
    /// does not compile
    #[tracing::instrument(name = "templates.load", skip_all)]
    pub async fn load(
        overrides: impl IntoIterator<Item = (LinkType, TemplateOverride)>,
    ) -> Result<Self, TemplateLoadingError> {
        let mut env = minijinja::Environment::new();

        for link_type in LinkType::ALL {
            env.add_template_owned(
                template_name(link_type, "subject"),
                defaults::subject(link_type).to_owned(),
            )?;
            env.add_template_owned(
                template_name(link_type, "html"),
                defaults::body(link_type).to_owned(),
            )?;
        }

        for (link_type, template_override) in overrides {
            if let Some(subject) = template_override.subject {
                debug!(%link_type, "Overriding subject");
                env.add_template_owned(template_name(link_type, "subject"), subject)?;
            }

            if let Some(path) = template_override.body {
                let body = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| TemplateLoadingError::Read {
                        path: path.clone(),
                        source,
                    })?;

                debug!(%link_type, %path, "Overriding body");
                env.add_template_owned(template_name(link_type, "html"), body)?;
            }
        }

        Ok(Self {
            environment: Arc::new(env),
        })
    }

    fn render(&self, template: String, context: &EmailLinkContext) -> Result<String, TemplateError> {
        let tmpl = match self.environment.get_template(&template) {
            Ok(tmpl) => tmpl,
            Err(source) => return Err(TemplateError::Missing { template, source }),
        };

        tmpl.render(context)
            .map_err(|source| TemplateError::Render { template, source })
    }

    /// Render the subject line of an email
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn render_email_subject(&self, context: &EmailLinkContext) -> Result<String, TemplateError> {
        let subject = self.render(template_name(context.link_type(), "subject"), context)?;
        Ok(subject.trim().to_owned())
    }

    /// Render the HTML body of an email
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn render_email_body(&self, context: &EmailLinkContext) -> Result<String, TemplateError> {
        self.render(template_name(context.link_type(), "html"), context)
    }
}
