pub mod gateway_controller;
