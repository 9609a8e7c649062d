use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Set by whoever creates or edits the bill; nothing flips it to `Overdue` on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Paid,
    Due,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub client_id: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: BillStatus,
}

impl Bill {
    /// Still owed: either explicitly overdue, or due with a due date in the past.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.status {
            BillStatus::Overdue => true,
            BillStatus::Due => self.due_date < today,
            BillStatus::Paid => false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub id: Option<String>,
    pub client_id: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: BillStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillRequest {
    pub client_id: Option<String>,
    pub amount: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<BillStatus>,
}

impl UpdateBillRequest {
    pub fn apply(self, bill: &mut Bill) {
        if let Some(client_id) = self.client_id {
            bill.client_id = client_id;
        }
        if let Some(amount) = self.amount {
            bill.amount = amount;
        }
        if let Some(due_date) = self.due_date {
            bill.due_date = due_date;
        }
        if let Some(status) = self.status {
            bill.status = status;
        }
    }
}
