//! Server-rendered pages
//!
//! Templates live in `templates/` and are embedded at compile time.
//! `partials/*.hbs` are registered as partials, everything else as a page
//! named after its path without the extension. Pages are rendered first and
//! then wrapped by `layout`.

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use chrono::DateTime;
use handlebars::Handlebars;
use rust_embed::Embed;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use super::constants;
use super::session::{Flash, read_flash};
use crate::errors::{PortalError, Result};
use crate::storage::{InternalUser, User};

#[derive(Embed)]
#[folder = "templates/"]
struct Templates;

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i32,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InternalUserView {
    pub id: i32,
    pub email: String,
    pub name: String,
}

/// Context shared by every page
#[derive(Debug, Serialize)]
pub struct Page {
    pub title: String,
    pub flash: Option<Flash>,
    pub current_user: Option<UserView>,
    pub internal_user: Option<InternalUserView>,
    #[serde(flatten)]
    pub body: Value,
}

impl Page {
    pub fn new<T: Into<String>>(title: T, body: Value) -> Self {
        Self {
            title: title.into(),
            flash: None,
            current_user: None,
            internal_user: None,
            body,
        }
    }

    pub fn user(mut self, user: Option<&User>) -> Self {
        self.current_user = user.map(|u| UserView {
            id: u.id,
            email: u.email.clone(),
            name: u.full_name(),
        });
        self
    }

    pub fn internal_user(mut self, user: Option<&InternalUser>) -> Self {
        self.internal_user = user.map(|u| InternalUserView {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone().unwrap_or_else(|| u.email.clone()),
        });
        self
    }

    /// Flash set by the handler itself (re-rendered forms)
    pub fn flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }
}

#[derive(Serialize)]
struct LayoutContext<'a> {
    #[serde(flatten)]
    page: &'a Page,
    content: String,
}

/// `<option>` entry
#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn select_options<T, I, F>(items: I, selected: &str, label: F) -> Vec<SelectOption>
where
    T: AsRef<str>,
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> String,
{
    items
        .into_iter()
        .map(|item| SelectOption {
            value: item.as_ref().to_string(),
            label: label(&item),
            selected: item.as_ref() == selected,
        })
        .collect()
}

/// RFC 3339 timestamp from the API as `11/07/2019 at 5:15PM UTC`
pub fn display_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts
            .with_timezone(&chrono::Utc)
            .format("%m/%d/%Y at %-I:%M%p UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);

        let mut count = 0;
        for file in Templates::iter() {
            let Some(asset) = Templates::get(&file) else {
                continue;
            };
            let source = String::from_utf8(asset.data.into_owned())
                .map_err(|e| PortalError::template(format!("{}: {}", file, e)))?;
            let name = file.trim_end_matches(".hbs");

            let registered = match name.strip_prefix("partials/") {
                Some(partial) => registry.register_partial(partial, source),
                None => registry.register_template_string(name, source),
            };
            registered.map_err(|e| PortalError::template(format!("{}: {}", file, e)))?;
            count += 1;
        }

        if !registry.has_template("layout") {
            return Err(PortalError::template("layout template is missing"));
        }
        debug!("Registered {} templates", count);
        Ok(Self { registry })
    }

    pub fn render(&self, template: &str, page: &Page) -> Result<String> {
        trace!("Rendering {}", template);
        let content = self.registry.render(template, page)?;
        Ok(self
            .registry
            .render("layout", &LayoutContext { page, content })?)
    }

    /// Render into a response; a pending flash is consumed
    pub fn respond(
        &self,
        req: &HttpRequest,
        status: StatusCode,
        template: &str,
        mut page: Page,
    ) -> Result<HttpResponse> {
        let pending = read_flash(req);
        if page.flash.is_none() {
            page.flash = pending.clone();
        }
        let html = self.render(template, &page)?;

        let mut builder = HttpResponse::build(status);
        builder.content_type("text/html; charset=utf-8");
        if pending.is_some() {
            let mut removal = Cookie::new(constants::FLASH_COOKIE, "");
            removal.set_path("/");
            removal.make_removal();
            builder.cookie(removal);
        }
        Ok(builder.body(html))
    }
}
