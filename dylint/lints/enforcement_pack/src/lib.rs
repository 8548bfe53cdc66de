//! Enforcement pack: custom lints for auth-gate.
//!
//! Keeps every diagnostic in the guard flowing through `tracing`, where the
//! request ID is attached and credentials pass through `Secret` redaction.
//!
//! ## Implemented Lints
//!
//! - `NO_PRINTLN`: Forbids println!, eprintln!, and dbg! macros to enforce
//!   structured logging via `GuardLog` and keep tokens out of stdout/stderr.
//! - `RAW_CREDENTIAL_IN_LOG`: Forbids passing a token, code, API key or client
//!   secret to a `tracing` macro or `format_args!` without `Secret::new`.

#![feature(rustc_private)]
#![warn(unused_extern_crates)]

extern crate rustc_ast;
extern crate rustc_lint;
extern crate rustc_session;
extern crate rustc_span;

use rustc_ast::token::TokenKind;
use rustc_ast::tokenstream::{TokenStream, TokenTree};
use rustc_ast::{Expr, ExprKind, MacCall};
use rustc_lint::{EarlyContext, EarlyLintPass, LintContext};
use rustc_session::{declare_lint_pass, declare_tool_lint};
use rustc_span::Span;

declare_tool_lint! {
    /// **What it does:** Forbids use of `println!`, `eprintln!`, and `dbg!` macros in library code.
    ///
    /// **Why is this bad?** These macros bypass the guard's logging:
    /// - They write directly to stdout/stderr, bypassing `GuardLog`
    /// - Their output carries no request ID
    /// - They may print session tokens or API keys unredacted
    ///
    /// **Known problems:** None.
    ///
    /// **Example:**
    /// ```rust,ignore
    /// // Bad - bypasses GuardLog
    /// println!("token: {}", token);
    /// eprintln!("swap failed: {}", err);
    /// dbg!(api_key);
    ///
    /// // Good - request-scoped and redacted
    /// use auth_gate::{GuardLog, Secret};
    /// let log = GuardLog::new(req.request_id(), "check");
    /// log.debug(format_args!("token {}", Secret::new(&token)));
    /// ```
    pub enforcement_pack::NO_PRINTLN,
    Deny,
    "use of println!, eprintln!, or dbg! macros; use tracing or GuardLog instead"
}

declare_tool_lint! {
    /// **What it does:** Flags `tracing` macros (`trace!` through `error!`) and
    /// `format_args!` whose arguments name a credential binding (`token`,
    /// `code`, `api_key`, `client_secret`, `secret`) outside a `Secret::new(..)`
    /// call.
    ///
    /// **Why is this bad?** Session tokens, one-time codes and API keys grant
    /// access on their own. Once written to a log they leak to everyone who can
    /// read it.
    ///
    /// **Known problems:** Matches on binding names only. A credential held in
    /// a differently named variable is not caught.
    ///
    /// **Example:**
    /// ```rust,ignore
    /// // Bad
    /// log.debug(format_args!("swapping {}", code));
    /// tracing::warn!(%token, "expired");
    ///
    /// // Good
    /// log.debug(format_args!("swapping {}", Secret::new(&code)));
    /// ```
    pub enforcement_pack::RAW_CREDENTIAL_IN_LOG,
    Deny,
    "credential formatted into a log message without `Secret::new`"
}

declare_lint_pass!(LogHygiene => [NO_PRINTLN, RAW_CREDENTIAL_IN_LOG]);

const LOG_MACROS: &[&str] = &["trace", "debug", "info", "warn", "error", "format_args"];

const CREDENTIAL_NAMES: &[&str] = &["token", "code", "api_key", "client_secret", "secret"];

impl EarlyLintPass for LogHygiene {
    fn check_expr(&mut self, cx: &EarlyContext<'_>, expr: &Expr) {
        if let ExprKind::MacCall(mac) = &expr.kind {
            check_macro(cx, mac, expr.span);
        }
    }
}

fn check_macro(cx: &EarlyContext<'_>, mac: &MacCall, span: Span) {
    let Some(last) = mac.path.segments.last() else {
        return;
    };
    let macro_name = last.ident.name.as_str();

    // `tracing::info!` as well as `info!`; print macros only bare
    if LOG_MACROS.contains(&macro_name) {
        if let Some(found) = raw_credential(&mac.args.tokens) {
            cx.span_lint(RAW_CREDENTIAL_IN_LOG, found, |diag| {
                diag.help("wrap the value in `auth_gate::Secret::new(..)` before formatting it");
                diag.note("tokens, codes and API keys must never reach a log unredacted");
            });
        }
        return;
    }

    if mac.path.segments.len() != 1 {
        return;
    }

    let help = match macro_name {
        "println" => "use `tracing::info!` or `GuardLog` for structured logging",
        "eprintln" => "use `tracing::error!` or `GuardLog` for structured logging",
        "dbg" => "use `tracing::debug!` or `GuardLog` for structured logging",
        _ => return,
    };
    cx.span_lint(NO_PRINTLN, span, |diag| {
        diag.help(help);
        diag.note(format!("`{}!` skips the request ID and may leak tokens", macro_name));
    });
}

/// Span of the first credential identifier not enclosed in `Secret::new(..)`.
fn raw_credential(tokens: &TokenStream) -> Option<Span> {
    let trees: Vec<&TokenTree> = tokens.iter().collect();
    let mut i = 0;
    while i < trees.len() {
        match trees[i] {
            TokenTree::Token(token, _) => {
                if let Some((ident, _)) = token.ident() {
                    if ident.name.as_str() == "Secret" && is_secret_new(&trees[i + 1..]) {
                        // Skip `Secret`, `::`, `new` and the argument group
                        i += 4;
                        continue;
                    }
                    let follows_dot = i > 0
                        && matches!(trees[i - 1], TokenTree::Token(t, _) if t.kind == TokenKind::Dot);
                    if !follows_dot && CREDENTIAL_NAMES.contains(&ident.name.as_str()) {
                        return Some(token.span);
                    }
                }
            }
            TokenTree::Delimited(_, _, _, inner) => {
                if let Some(found) = raw_credential(inner) {
                    return Some(found);
                }
            }
        }
        i += 1;
    }
    None
}

fn is_secret_new(rest: &[&TokenTree]) -> bool {
    match rest {
        [TokenTree::Token(sep, _), TokenTree::Token(name, _), TokenTree::Delimited(..), ..] => {
            sep.kind == TokenKind::PathSep
                && name.ident().is_some_and(|(ident, _)| ident.name.as_str() == "new")
        }
        _ => false,
    }
}

#[unsafe(no_mangle)]
#[allow(unsafe_code)]
pub extern "C" fn register_lints(_sess: &rustc_session::Session, lint_store: &mut rustc_lint::LintStore) {
    lint_store.register_lints(&[&NO_PRINTLN, &RAW_CREDENTIAL_IN_LOG]);
    lint_store.register_early_pass(|| Box::new(LogHygiene));
}

#[unsafe(no_mangle)]
pub fn dylint_version() -> *mut std::os::raw::c_char {
    std::ffi::CString::new(dylint_linting::DYLINT_VERSION)
        .expect("version string contains null byte")
        .into_raw()
}
