// src/email_templates.rs

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Quote,
    Appointment,
    Followup,
    General,
}

/// A canned reply. `[Platzhalter]` markers are filled in by hand before sending.
#[derive(Debug, Clone, Serialize)]
pub struct EmailTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub category: TemplateCategory,
    pub subject: &'static str,
    pub content: &'static str,
}

pub const TEMPLATES: [EmailTemplate; 4] = [
    EmailTemplate {
        id: "tpl1",
        name: "Preisangebot Gartenpflege",
        category: TemplateCategory::Quote,
        subject: "Ihr Angebot für Gartenpflegeservice",
        content: "Sehr geehrte/r [Kundenname],

vielen Dank für Ihre Anfrage bezüglich unserer Gartenpflegedienste.

Gerne unterbreiten wir Ihnen folgendes Angebot:
- Service: [Service-Beschreibung]
- Umfang: [Gartengröße/Details]
- Preis: [Betrag] EUR

Wir freuen uns auf Ihre Rückmeldung.

Mit freundlichen Grüßen
Ihr GreenBros Team",
    },
    EmailTemplate {
        id: "tpl2",
        name: "Terminbestätigung",
        category: TemplateCategory::Appointment,
        subject: "Terminbestätigung - Gartenpflege",
        content: "Sehr geehrte/r [Kundenname],

hiermit bestätigen wir Ihren Termin:

Datum: [Datum]
Uhrzeit: [Uhrzeit]
Service: [Service-Beschreibung]
Mitarbeiter: [Mitarbeiter-Namen]

Bei Fragen stehen wir Ihnen gerne zur Verfügung.

Mit freundlichen Grüßen
Ihr GreenBros Team",
    },
    EmailTemplate {
        id: "tpl3",
        name: "Service-Nachbereitung",
        category: TemplateCategory::Followup,
        subject: "Nachbereitung - Ihr Gartenpflegetermin",
        content: "Sehr geehrte/r [Kundenname],

wir hoffen, Sie sind mit unserem Service zufrieden.

Durchgeführte Arbeiten:
- [Aufgabe 1]
- [Aufgabe 2]

Für Rückfragen oder weitere Termine stehen wir Ihnen gerne zur Verfügung.

Mit freundlichen Grüßen
Ihr GreenBros Team",
    },
    EmailTemplate {
        id: "tpl4",
        name: "Allgemeine Anfrage",
        category: TemplateCategory::General,
        subject: "Antwort auf Ihre Anfrage",
        content: "Sehr geehrte/r [Kundenname],

vielen Dank für Ihre Nachricht.

[Ihre persönliche Nachricht hier]

Wir freuen uns auf Ihre Rückmeldung.

Mit freundlichen Grüßen
Ihr GreenBros Team",
    },
];

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/email-templates")
            .route("", web::get().to(list_templates))
            .route("/{template_id}", web::get().to(get_template)),
    );
}

/// GET /api/email-templates
pub async fn list_templates() -> HttpResponse {
    HttpResponse::Ok().json(&TEMPLATES)
}

/// GET /api/email-templates/{template_id}
pub async fn get_template(template_id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let template = TEMPLATES
        .iter()
        .find(|t| t.id == template_id.as_str())
        .ok_or(ApiError::NotFound("Template"))?;
    Ok(HttpResponse::Ok().json(template))
}
