//! Resolution of HTML companion files.
//!
//! A companion matters only through its `<script src>` tags. Each tag naming
//! Strand code is resolved against the HTML file's own URI; a target that
//! does not exist is reported, anything else is silently ignored.

use strand_source::{Source, SourceFactory, UriResolution};
use strand_syntax::HtmlUnit;

use crate::entry::{is_unit_source, ResolvedHtml};
use crate::errors::error_missing_script;

/// The library a script tag names, if it names Strand code at all.
fn script_target(factory: &SourceFactory, html: &Source, uri: &str) -> Option<Source> {
    match factory.resolve_uri(Some(html), uri) {
        UriResolution::Source(source) if is_unit_source(&source) => Some(source),
        _ => None,
    }
}

/// Existing libraries named by the scripts of `unit`, without duplicates.
pub fn referenced_libraries(factory: &SourceFactory, html: &Source, unit: &HtmlUnit) -> Vec<Source> {
    let mut libraries: Vec<Source> = Vec::new();
    for script in &unit.scripts {
        if let Some(source) = script_target(factory, html, &script.uri) {
            if factory.exists(&source) && !libraries.contains(&source) {
                libraries.push(source);
            }
        }
    }
    libraries
}

/// Resolves the scripts of `unit`.
pub fn resolve_html(factory: &SourceFactory, html: &Source, unit: &HtmlUnit) -> ResolvedHtml {
    let mut libraries: Vec<Source> = Vec::new();
    let mut diagnostics = Vec::new();
    for script in &unit.scripts {
        let Some(source) = script_target(factory, html, &script.uri) else {
            continue;
        };
        if !factory.exists(&source) {
            diagnostics.push(error_missing_script(&script.uri, script.span));
        } else if !libraries.contains(&source) {
            libraries.push(source);
        }
    }
    ResolvedHtml {
        source: html.clone(),
        libraries,
        diagnostics,
    }
}
