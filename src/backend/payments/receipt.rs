//! PDF receipts
//!
//! Receipts are rendered on demand from the stored payment. The balance line
//! shows the student's balance at the time the receipt is printed.

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::backend::error::BackendError;
use crate::shared::fees::format_kes;
use crate::shared::{FeeDetails, Payment, Student};

/// A5 portrait
const PAGE_WIDTH: f32 = 148.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 7.0;

/// One printed line; `true` renders in bold
pub type ReceiptLine = (String, bool);

pub fn receipt_lines(school_name: &str, payment: &Payment, student: &Student, balance: &FeeDetails) -> Vec<ReceiptLine> {
    let mut lines = vec![
        (school_name.to_string(), true),
        ("OFFICIAL RECEIPT".to_string(), true),
        (String::new(), false),
        (format!("Receipt No: {}", payment.receipt_number), false),
        (format!("Date: {}", payment.paid_at.format("%d %b %Y %H:%M")), false),
        (String::new(), false),
        (format!("Student: {}", student.name), false),
        (format!("Admission No: {}", student.admission_number), false),
        (format!("Grade: {}", student.grade_level), false),
        (String::new(), false),
        (format!("Amount: {}", format_kes(payment.amount)), true),
        (format!("Method: {}", payment.method.label()), false),
    ];

    if let Some(reference) = &payment.reference {
        lines.push((format!("Reference: {}", reference), false));
    }
    if let Some(in_kind) = &payment.in_kind {
        lines.push((format!("Items: {} x {}", in_kind.quantity, in_kind.item), false));
    }
    if let Some(notes) = &payment.notes {
        lines.push((format!("Notes: {}", notes), false));
    }

    lines.push((String::new(), false));
    lines.push((format!("Total fees: {}", format_kes(balance.total_fees)), false));
    lines.push((format!("Paid to date: {}", format_kes(balance.fees_paid)), false));
    lines.push((format!("Balance: {}", format_kes(balance.remaining_balance)), true));
    lines
}

/// Render a receipt as PDF bytes
pub fn render_receipt_pdf(
    school_name: &str,
    payment: &Payment,
    student: &Student,
    balance: &FeeDetails,
) -> Result<Vec<u8>, BackendError> {
    let title = format!("Receipt {}", payment.receipt_number);
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "receipt");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| BackendError::internal(format!("failed to load receipt font: {}", e)))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| BackendError::internal(format!("failed to load receipt font: {}", e)))?;

    let layer = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN;
    for (index, (text, is_bold)) in receipt_lines(school_name, payment, student, balance).into_iter().enumerate() {
        if !text.is_empty() {
            let size = if index == 0 { 16.0 } else { 11.0 };
            let font = if is_bold { &bold } else { &regular };
            layer.use_text(text, size, Mm(MARGIN), Mm(y), font);
        }
        y -= LINE_HEIGHT;
    }

    doc.save_to_bytes()
        .map_err(|e| BackendError::internal(format!("failed to render receipt: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::payment::InKindDetails;
    use crate::shared::{BoardingStatus, PaymentMethod};
    use chrono::Utc;
    use uuid::Uuid;

    fn fixtures() -> (Payment, Student, FeeDetails) {
        let now = Utc::now();
        let balance = FeeDetails { total_fees: 15000.0, fees_paid: 5000.0, remaining_balance: 10000.0 };
        let student = Student {
            id: Uuid::new_v4(),
            admission_number: "ADM001".to_string(),
            name: "Achieng Otieno".to_string(),
            grade_level: "Grade 3".to_string(),
            boarding_status: BoardingStatus::Day,
            has_transport: false,
            transport_route: None,
            parent_name: "Mary Otieno".to_string(),
            parent_phone: "+254712345678".to_string(),
            parent_email: None,
            parent_user_id: None,
            fee_details: balance,
            created_at: now,
            updated_at: now,
        };
        let payment = Payment {
            id: Uuid::new_v4(),
            student_id: student.id,
            admission_number: "ADM001".to_string(),
            amount: 5000.0,
            method: PaymentMethod::InKind,
            reference: None,
            in_kind: Some(InKindDetails { item: "Maize (90kg bags)".to_string(), quantity: 2.0 }),
            receipt_number: "RCT-20250131-9F3A0C1B".to_string(),
            notes: None,
            recorded_by: None,
            paid_at: now,
            created_at: now,
        };
        (payment, student, balance)
    }

    #[test]
    fn test_receipt_lines() {
        let (payment, student, balance) = fixtures();
        let lines = receipt_lines("Hillside Academy", &payment, &student, &balance);
        let text: Vec<&str> = lines.iter().map(|(t, _)| t.as_str()).collect();

        assert_eq!(text[0], "Hillside Academy");
        assert!(text.contains(&"Receipt No: RCT-20250131-9F3A0C1B"));
        assert!(text.contains(&"Amount: KES 5,000.00"));
        assert!(text.contains(&"Items: 2 x Maize (90kg bags)"));
        assert!(text.contains(&"Balance: KES 10,000.00"));
        assert!(!text.iter().any(|t| t.starts_with("Reference:")));
    }

    #[test]
    fn test_render_pdf() {
        let (payment, student, balance) = fixtures();
        let bytes = render_receipt_pdf("Hillside Academy", &payment, &student, &balance).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
