mod events;
mod health_test;
