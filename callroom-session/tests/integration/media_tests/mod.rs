mod test_device_errors;
mod test_screen_share;
