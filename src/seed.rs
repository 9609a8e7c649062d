// src/seed.rs

use chrono::{Days, NaiveDate};

use crate::models::{Availability, Bill, BillStatus, Client, Employee, Task, TaskStatus};
use crate::store::Database;

fn client(id: &str, name: &str, address: &str, phone: &str, email: &str) -> Client {
    Client {
        id: id.into(),
        name: name.into(),
        address: address.into(),
        contact_person: None,
        phone: Some(phone.into()),
        email: Some(email.into()),
    }
}

fn employee(id: &str, name: &str, role: &str, days: [bool; 7]) -> Employee {
    let [monday, tuesday, wednesday, thursday, friday, saturday, sunday] = days;
    Employee {
        id: id.into(),
        name: name.into(),
        role: Some(role.into()),
        avatar_url: Some(format!("https://i.pravatar.cc/150?u={id}")),
        availability: Availability {
            monday,
            tuesday,
            wednesday,
            thursday,
            friday,
            saturday,
            sunday,
        },
    }
}

fn task(
    id: &str,
    title: &str,
    client_id: &str,
    assigned_to: &[&str],
    due_date: NaiveDate,
    status: TaskStatus,
    description: &str,
) -> Task {
    Task {
        id: id.into(),
        title: title.into(),
        client_id: client_id.into(),
        assigned_to: assigned_to.iter().map(|s| s.to_string()).collect(),
        due_date,
        status,
        description: description.into(),
        contact_person: None,
    }
}

fn bill(id: &str, client_id: &str, amount: f64, due_date: NaiveDate, status: BillStatus) -> Bill {
    Bill {
        id: id.into(),
        client_id: client_id.into(),
        amount,
        due_date,
        status,
    }
}

/// Sample data written into a freshly created database file, with due dates around `today`.
pub fn sample_database(today: NaiveDate) -> Database {
    let tomorrow = today + Days::new(1);
    let yesterday = today - Days::new(1);
    let next_week = today + Days::new(7);
    let fixed = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(today);

    Database {
        clients: vec![
            client("c1", "Alice Johnson", "Eichenweg 123", "555-0101", "alice@example.com"),
            client("c2", "Bob Williams", "Kiefernstraße 456", "555-0102", "bob@example.com"),
            client("c3", "Charlie Brown", "Ahorn-Allee 789", "555-0103", "charlie@example.com"),
            client("c4", "Diana Miller", "Birken-Weg 101", "555-0104", "diana@example.com"),
        ],
        employees: vec![
            employee("e1", "David Green", "Chefgärtner", [true, true, true, true, false, false, false]),
            employee("e2", "Eve Gardener", "Gartenbau-Expertin", [true, true, false, true, true, false, false]),
            employee("e3", "Frank Spade", "Landschaftsgärtner", [false, false, true, true, true, true, false]),
            employee("e4", "Grace Roots", "Nachwuchs-Gärtnerin", [true, true, true, true, true, false, false]),
        ],
        tasks: vec![
            task("t1", "Rasenmähen & Kantenschneiden", "c1", &["e1", "e4"], today, TaskStatus::InProgress,
                "Standardmäßiges Mähen, Kanten an allen Gehwegen und der Einfahrt schneiden."),
            task("t2", "Unkraut jäten in Beeten", "c2", &["e2"], today, TaskStatus::Open,
                "Entfernen Sie alles Unkraut aus den vorderen und hinteren Gartenbeeten."),
            task("t3", "Rosensträucher beschneiden", "c1", &["e2"], tomorrow, TaskStatus::Open,
                "Sorgfältiger Schnitt aller 15 Rosensträucher."),
            task("t4", "Sprinkleranlage installieren", "c3", &["e1", "e3"], next_week, TaskStatus::Open,
                "Vollständige Installation einer 5-Zonen-Sprinkleranlage."),
            task("t5", "Blumenbeete mulchen", "c4", &["e4"], tomorrow, TaskStatus::InProgress,
                "5 cm dunkelbraunen Mulch auf alle Blumenbeete auftragen."),
            task("t6", "Vierteljährliche Düngung", "c2", &["e1"], yesterday, TaskStatus::Completed,
                "Ausgewogenen Dünger auf alle Rasenflächen auftragen."),
            task("t7", "Herbst-Aufräumarbeiten", "c3", &["e1", "e4"], today, TaskStatus::Open,
                "Laub harken, Schmutz entfernen und auf den Winter vorbereiten."),
            task("t8", "Neue einjährige Pflanzen setzen", "c4", &["e2"], yesterday, TaskStatus::Completed,
                "Bunte einjährige Pflanzen am vorderen Gehweg pflanzen."),
        ],
        bills: vec![
            bill("b1", "c1", 150.0, next_week, BillStatus::Due),
            bill("b2", "c2", 75.0, yesterday, BillStatus::Paid),
            bill("b3", "c3", 1200.0, today, BillStatus::Due),
            bill("b4", "c4", 250.0, fixed(2023, 12, 15), BillStatus::Overdue),
            bill("b5", "c2", 75.0, fixed(2023, 11, 20), BillStatus::Paid),
        ],
        documents: Vec::new(),
        emails: Vec::new(),
    }
}
