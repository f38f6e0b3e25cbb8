mod core;
pub use self::core::{
    Function, FunctionCall, FunctionCallFn, Message, Parameters, Property, Role, ToolDefinition,
    ToolType, completion,
};
