mod common;

mod check_tests;
mod fetch_tests;
mod install_tests;
mod uninstall_tests;
