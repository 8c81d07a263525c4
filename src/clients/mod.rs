pub mod request_queue;
pub mod web_services_call;
