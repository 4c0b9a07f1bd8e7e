pub mod agent;
pub mod campaign;
pub mod contact;
pub mod owner;
pub mod sent_email;
pub mod template;
pub mod trademark;
