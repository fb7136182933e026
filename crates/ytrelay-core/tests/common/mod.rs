pub mod fake_tools;
