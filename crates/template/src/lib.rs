//! Prompt templates.
//!
//! A small subset of the `{{ }}` action language (`text/template` syntax) model
//! files ship their prompt formats in:
//!
//! ```text
//! {{ if .System }}<|system|>{{ .System }}</s>{{ end }}
//! <|user|>{{ .Prompt }}</s>
//! <|assistant|>{{ .Response }}</s>
//! ```
//!
//! Templates compile into a closed [`Node`] tree. Before execution the tree
//! is rewritten around the *output marker*, the first top-level action that
//! references `.Response`: rendering a history turn keeps the whole tree,
//! rendering the final turn cuts everything after the marker so generation
//! continues right where the response goes.
//!
//! # Supported syntax
//!
//! | Construct | Example |
//! |-----------|---------|
//! | Field / dot | `{{ .System }}`, `{{ . }}` |
//! | Trim markers | `{{- .Prompt -}}` |
//! | Comments | `{{/* ignored */}}` |
//! | Conditionals | `{{ if .X }}..{{ else if .Y }}..{{ else }}..{{ end }}` |
//! | Scoping | `{{ with .X }}{{ . }}{{ end }}` |
//! | Pipelines | `{{ .Prompt \| len }}`, `{{ printf "%s!" (print .Prompt) }}` |
//! | Functions | `and or not eq ne len print println printf` |

mod exec;
mod lexer;
pub mod node;
mod parser;
pub mod render;

pub use exec::Value;
pub use node::{Action, Arg, Branch, Command, Node, Pipeline};
pub use render::{
    Bindings, PROMPT_FIELD, RESPONSE_FIELD, SYSTEM_FIELD, Template, format_for_response,
    is_response_node, render,
};
