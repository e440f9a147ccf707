//! ClaroDB: a terminal workbench for exploring tabular data.
//!
//! Import CSV/JSON/TXT files into per-workspace SQLite databases, model
//! joins on a drag canvas, and ask natural-language questions that an LLM
//! translates to SQL.

pub mod canvas;
pub mod cli;
pub mod conversation;
pub mod llm;
pub mod tui;
