pub mod style;

pub use style::{Cities, Style};
