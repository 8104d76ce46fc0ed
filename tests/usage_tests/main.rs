#[path = "../test_utils.rs"]
#[allow(unused)]
mod test_utils;
mod test_framework;

mod copy_tests;
mod variant_tests;
mod error_tests;
mod misc_tests;
