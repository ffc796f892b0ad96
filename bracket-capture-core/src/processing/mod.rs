pub mod bracket_builder;
