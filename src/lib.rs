pub mod ast;
pub mod capability;
#[cfg(feature = "cli")]
pub mod cli;
pub mod convert;
pub mod engine;
pub mod evaluator;
pub mod events;
pub mod lexer;
pub mod parser;
pub mod picker;
pub mod query;
pub mod scheduler;
pub mod value;

pub use capability::{Capabilities, Capability, CapabilityError, Continuation};
pub use convert::{from_json, parse_json, to_json};
pub use engine::Engine;
pub use evaluator::{Cursor, EvalError, Flow};
pub use events::{Event, Events, Hit, Label, Listener, ListenerId};
pub use lexer::Scanner;
pub use parser::{ParseError, Parser, PathExpression, parse};
pub use picker::{BarrierStats, Completion, Notes, Picker, PickerCache};
pub use query::{Preset, Query};
pub use scheduler::Scheduler;
pub use value::{Key, Map, Value, Window};
