mod customer_tests;
mod scan_tests;
