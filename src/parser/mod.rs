mod functions;
mod tokenizer;

pub use functions::{extract_arguments, extract_functions, FunctionDef};
pub use tokenizer::{caller_name, extract_words, find_function_definition_line, module_name};
