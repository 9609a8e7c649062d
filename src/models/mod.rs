mod bill;
mod client;
mod document;
mod email;
mod employee;
mod task;

pub use bill::{Bill, BillStatus, CreateBillRequest, UpdateBillRequest};
pub use client::{Client, CreateClientRequest, UpdateClientRequest};
pub use document::{Document, DocumentType};
pub use email::{
    CreateEmailRequest, Email, EmailKind, EmailStatus, InvalidTransition, SendEmailRequest,
    UpdateEmailStatusRequest,
};
pub use employee::{Availability, CreateEmployeeRequest, Employee, UpdateEmployeeRequest};
pub use task::{CreateTaskRequest, Task, TaskStatus, UpdateTaskRequest, UpdateTaskStatusRequest};

/// Returns `true` when a request string is empty or whitespace only.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::is_blank;

    #[test]
    fn whitespace_only_counts_as_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \t\n"));
        assert!(!is_blank(" Eichenweg 1 "));
    }
}
