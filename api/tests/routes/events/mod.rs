mod admin_test;
mod check_in_test;
mod review_test;
