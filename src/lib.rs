//! Macro discovery and menu ordering for AvsPmod-style macro directories
//!
//! A macros root is scanned into an ordered [`MenuTree`]: files become
//! entries, subdirectories become submenus, and a leading `[key]` in a
//! name controls ordering. Running a macro goes through [`MacroHost`],
//! which hands the script an explicit [`MacroContext`].

pub mod config;
pub mod context;
pub mod invoke;
pub mod loader;
pub mod menu_item;
pub mod naming;
pub mod params;

pub use config::{Config, load_config, load_config_or_default};
pub use context::{Document, MacroContext, ProcessOutput};
pub use invoke::{CommandRunner, Invocation, MacroHost, ScriptRunner};
pub use loader::{MacroMenu, scan};
pub use menu_item::{MacroEntry, MenuNode, MenuTree, ScanWarning, Submenu};
pub use naming::{KeySeparator, NamingRules};
pub use params::Params;
