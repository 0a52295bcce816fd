//! parlance — schema-driven command and message-chain parsing.
//!
//! Define a command as a tree of header, typed argument slots, options,
//! and nested subcommands; parse either plain strings or heterogeneous
//! token sequences against it and get back a structured result tree.
//!
//! ```
//! use parlance::{Arg, Args, Command, Opt, Pattern, Subcommand};
//!
//! let pip = Command::new("/pip")
//!     .subcommand(
//!         Subcommand::new("install")?
//!             .option(Opt::new("-u|--upgrade")?)
//!             .args(Args::try_new(vec![Arg::new("pak", Pattern::text())])?),
//!     )
//!     .option(Opt::new("list")?)
//!     .build()?;
//!
//! let result = pip.parse("/pip install numpy --upgrade");
//! assert!(result.matched);
//! assert_eq!(
//!     result.query("install.pak")?.and_then(|v| v.as_str().map(String::from)),
//!     Some("numpy".to_string()),
//! );
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Commands are immutable after construction and freely shareable across
//! threads; each parse owns its own cursor and result. Shared state (the
//! registry, shortcut store, and recent-parse cache) lives behind a single
//! mutex in [`Registry`].

pub mod args;
pub mod argv;
pub mod behavior;
pub mod command;
pub mod completion;
pub mod error;
pub mod executor;
pub mod fuzzy;
pub mod i18n;
pub mod lru;
pub mod node;
pub mod pattern;
pub mod registry;
pub mod result;
pub mod shortcut;
pub mod token;

pub(crate) mod analyser;

pub use args::{Arg, ArgDefault, ArgValue, Args, VariadicKind};
pub use behavior::{Behavior, BehaviorError, CoolDown, Exclusion, SetDefault};
pub use command::{Builtins, Command, CommandBuilder, CommandConfig, Namespace, ParseInput, Prefix};
pub use completion::CompSession;
pub use error::{BuiltinKind, ParseError, SchemaError};
pub use executor::{AsyncExecutor, BoxFuture, ExecuteError, Executor};
pub use i18n::LangStore;
pub use node::{Action, Opt, Subcommand};
pub use pattern::{Mismatch, Pattern};
pub use registry::Registry;
pub use result::{FromValue, HeadMatch, OptionResult, ParseResult, SubcommandResult};
pub use shortcut::{ShortcutEntry, ShortcutStore};
pub use token::{OpaqueToken, Token, Value};
