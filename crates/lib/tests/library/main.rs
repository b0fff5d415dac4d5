mod common;

mod assembly_tests;
mod classifier_tests;
mod directory_tests;
