pub mod types;

pub use types::{
    DataType, DocumentProfile, DraftStatus, DuplicateVariable, Template, VariableDescriptor,
};
