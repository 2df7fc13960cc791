// redraft-common: data model, patch engine and protocol types shared by the
// redraft crates. Pure code, no I/O.

pub mod diff;
pub mod patch;
pub mod protocol;
pub mod types;
