//! Diagnostic error types for faderlink.
//!
//! Rule-level failures during dispatch are *not* errors in this sense: they
//! are [`crate::Abort`] values that the engine logs and moves past. The types
//! here cover the places where something can genuinely fail for the caller:
//! parsing expressions, loading configuration and decoding OSC. A datagram
//! that fails to decode is logged and dropped by the bridge loop, so
//! [`OscError`] never escalates to a [`BridgeError`].

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error for the bridge binary.
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("{context}: {source}")]
    #[diagnostic(
        code(faderlink::io),
        help("Check that the listen address is free and that the configured hosts resolve.")
    )]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Expression errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ExprError {
    #[error("unexpected character {found:?} at offset {offset} in `{expr}`")]
    #[diagnostic(code(faderlink::expr::unexpected_char))]
    UnexpectedChar { expr: String, offset: usize, found: char },

    #[error("unexpected token `{found}` in `{expr}`")]
    #[diagnostic(code(faderlink::expr::unexpected_token))]
    UnexpectedToken { expr: String, found: String },

    #[error("unexpected end of expression `{expr}`")]
    #[diagnostic(code(faderlink::expr::unexpected_end))]
    UnexpectedEnd { expr: String },

    #[error("unknown variable `{name}`")]
    #[diagnostic(
        code(faderlink::expr::unknown_variable),
        help("Declare it under [constants] or [variables], or bind it from a `from` template.")
    )]
    UnknownVariable { name: String },

    #[error("division by zero")]
    #[diagnostic(code(faderlink::expr::division_by_zero))]
    DivisionByZero,

    #[error("expression evaluated to a non-finite number")]
    #[diagnostic(code(faderlink::expr::non_finite))]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum SolveError {
    #[error("equation `{equation}` is not affine in its unknowns")]
    #[diagnostic(
        code(faderlink::solve::non_linear),
        help("Templates may scale and offset variables, but not multiply or divide one variable by another.")
    )]
    NonLinear { equation: String },

    #[error("equations are inconsistent")]
    #[diagnostic(code(faderlink::solve::inconsistent))]
    Inconsistent,

    #[error("equations do not determine {}", .unknowns.join(", "))]
    #[diagnostic(code(faderlink::solve::underdetermined))]
    Underdetermined { unknowns: Vec<String> },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expr(#[from] ExprError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    #[diagnostic(code(faderlink::config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {source}")]
    #[diagnostic(code(faderlink::config::parse), help("The configuration file must be valid TOML."))]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    #[error("{context}: invalid expression: {source}")]
    #[diagnostic(code(faderlink::config::expression))]
    InvalidExpression {
        context: String,
        #[source]
        source: ExprError,
    },

    #[error("{rule}: `{key}` template must start with an address string")]
    #[diagnostic(
        code(faderlink::config::address),
        help("Write templates as [\"/address\", arg, ...], e.g. [\"/control\", 1, \"c\", \"v\"].")
    )]
    InvalidAddress { rule: String, key: &'static str },

    #[error("variable `{name}` shadows a constant of the same name")]
    #[diagnostic(code(faderlink::config::shadowed_constant))]
    VariableShadowsConstant { name: String },

    #[error("invalid endpoint `{value}`")]
    #[diagnostic(code(faderlink::config::endpoint), help("Endpoints are written as \"host:port\"."))]
    InvalidEndpoint { value: String },

    #[error("no automation endpoint configured")]
    #[diagnostic(
        code(faderlink::config::missing_send),
        help("Set `send = \"host:port\"` to the console's OSC address.")
    )]
    MissingSend,

    #[error("unknown feedback flag `{name}`")]
    #[diagnostic(code(faderlink::config::feedback_flag))]
    UnknownFeedbackFlag { name: String },
}

// ---------------------------------------------------------------------------
// OSC codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum OscError {
    #[error("packet truncated at byte {offset}")]
    #[diagnostic(code(faderlink::osc::truncated))]
    Truncated { offset: usize },

    #[error("string at byte {offset} is not terminated or not UTF-8")]
    #[diagnostic(code(faderlink::osc::bad_string))]
    BadString { offset: usize },

    #[error("address `{address}` does not start with '/'")]
    #[diagnostic(code(faderlink::osc::bad_address))]
    BadAddress { address: String },

    #[error("missing type tag string")]
    #[diagnostic(code(faderlink::osc::missing_type_tags))]
    MissingTypeTags,

    #[error("unsupported type tag '{tag}'")]
    #[diagnostic(code(faderlink::osc::unsupported_type))]
    UnsupportedType { tag: char },
}
