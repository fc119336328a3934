mod autoload_test;
mod multi_threaded_test;
