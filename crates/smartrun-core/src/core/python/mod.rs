pub mod python_sys;
