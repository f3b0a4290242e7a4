//! Invoice and reminder message bodies.

use crate::contract::{Client, Invoice, InvoiceLineItem, User};
use crate::domain::dates::format_long_date;

/// Everything a mail body needs about one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceMessage {
    pub invoice_number: String,
    pub client_name: Option<String>,
    pub total: f64,
    pub due_date: Option<String>,
    pub line_items: Vec<InvoiceLineItem>,
    pub business_name: Option<String>,
    pub business_email: Option<String>,
}

impl InvoiceMessage {
    pub fn compose(invoice: &Invoice, client: Option<&Client>, business: Option<&User>) -> Self {
        Self {
            invoice_number: invoice.invoice_number.clone(),
            client_name: client.map(|c| c.name.clone()).filter(|n| !n.trim().is_empty()),
            total: invoice.total,
            due_date: invoice.due_date.clone(),
            line_items: invoice.line_items.clone(),
            business_name: business.and_then(|u| u.business_name.clone()),
            business_email: business.and_then(|u| u.business_email.clone()),
        }
    }

    pub fn invoice_subject(&self) -> String {
        format!(
            "Invoice #{} from {}",
            self.invoice_number,
            self.business_name.as_deref().unwrap_or("Your Business")
        )
    }

    pub fn reminder_subject(&self) -> String {
        format!("Payment Reminder: Invoice #{}", self.invoice_number)
    }
}

fn money(v: f64) -> String {
    format!("${v:.2}")
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn invoice_html(msg: &InvoiceMessage) -> String {
    let client = escape(msg.client_name.as_deref().unwrap_or("Valued Customer"));
    let business = escape(msg.business_name.as_deref().unwrap_or("Your Business"));
    let business_email = escape(msg.business_email.as_deref().unwrap_or_default());
    let number = escape(&msg.invoice_number);
    let due = escape(&format_long_date(msg.due_date.as_deref()));
    let total = money(msg.total);

    let rows: String = msg
        .line_items
        .iter()
        .map(|item| {
            format!(
                r#"<tr><td style="padding:12px;border-bottom:1px solid #e5e7eb;">{}</td><td style="padding:12px;border-bottom:1px solid #e5e7eb;text-align:center;">{}</td><td style="padding:12px;border-bottom:1px solid #e5e7eb;text-align:right;">{}</td><td style="padding:12px;border-bottom:1px solid #e5e7eb;text-align:right;font-weight:600;">{}</td></tr>"#,
                escape(&item.description),
                item.quantity,
                money(item.rate),
                money(item.amount),
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1.0"></head>
<body style="margin:0;padding:0;font-family:-apple-system,'Segoe UI',Roboto,Arial,sans-serif;background-color:#f3f4f6;">
<div style="max-width:600px;margin:0 auto;padding:40px 20px;">
  <div style="background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);border-radius:16px 16px 0 0;padding:32px;text-align:center;">
    <h1 style="color:white;margin:0;font-size:28px;">Invoice #{number}</h1>
    <p style="color:rgba(255,255,255,0.9);margin:8px 0 0 0;">from {business}</p>
  </div>
  <div style="background:white;padding:32px;border-radius:0 0 16px 16px;">
    <p>Dear <strong>{client}</strong>,</p>
    <p style="color:#6b7280;">Please find your invoice details below. We appreciate your business and look forward to serving you again.</p>
    <div style="background:#f9fafb;border-radius:12px;padding:24px;margin-bottom:32px;">
      <p style="margin:0;font-size:12px;color:#6b7280;">INVOICE NUMBER</p>
      <p style="margin:4px 0 16px 0;font-size:18px;font-weight:600;">#{number}</p>
      <p style="margin:0;font-size:12px;color:#6b7280;">AMOUNT DUE</p>
      <p style="margin:4px 0 16px 0;font-size:24px;font-weight:700;color:#667eea;">{total}</p>
      <p style="margin:0;font-size:12px;color:#6b7280;">DUE DATE</p>
      <p style="margin:4px 0 0 0;font-size:16px;">{due}</p>
    </div>
    <table style="width:100%;border-collapse:collapse;margin-bottom:24px;">
      <thead><tr style="background:#f3f4f6;"><th style="padding:12px;text-align:left;">Description</th><th style="padding:12px;">Qty</th><th style="padding:12px;text-align:right;">Rate</th><th style="padding:12px;text-align:right;">Total</th></tr></thead>
      <tbody>{rows}</tbody>
      <tfoot><tr><td colspan="3" style="padding:16px 12px;text-align:right;font-weight:600;">Total Amount:</td><td style="padding:16px 12px;text-align:right;font-size:20px;font-weight:700;color:#667eea;">{total}</td></tr></tfoot>
    </table>
    <div style="background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);border-radius:12px;padding:24px;text-align:center;">
      <p style="margin:0;color:rgba(255,255,255,0.9);">Payment is due by</p>
      <p style="margin:8px 0 0 0;font-size:20px;font-weight:700;color:white;">{due}</p>
    </div>
    <div style="margin-top:32px;padding-top:24px;border-top:1px solid #e5e7eb;text-align:center;">
      <p style="margin:0;color:#6b7280;">Thank you for your business!</p>
      <p style="margin:8px 0 0 0;font-size:12px;color:#9ca3af;">{business} &bull; {business_email}</p>
    </div>
  </div>
</div>
</body>
</html>
"#
    )
}

pub fn invoice_text(msg: &InvoiceMessage) -> String {
    let client = msg.client_name.as_deref().unwrap_or("Valued Customer");
    let business = msg.business_name.as_deref().unwrap_or("Your Business");
    let business_email = msg.business_email.as_deref().unwrap_or_default();
    let due = format_long_date(msg.due_date.as_deref());
    let total = money(msg.total);
    let items: String = msg
        .line_items
        .iter()
        .map(|item| {
            format!(
                "  * {} (x{}) - {}\n",
                item.description,
                item.quantity,
                money(item.amount)
            )
        })
        .collect();

    format!(
        "INVOICE #{number}\nfrom {business}\n\n=====================================\n\n\
Dear {client},\n\nPlease find your invoice details below.\n\n\
INVOICE DETAILS\n---------------\nInvoice Number: #{number}\nAmount Due: {total}\nDue Date: {due}\n\n\
ITEMS\n-----\n{items}\nTOTAL: {total}\n\n=====================================\n\n\
Payment is due by {due}\n\nThank you for your business!\n\n{business}\n{business_email}\n",
        number = msg.invoice_number,
    )
}

pub fn reminder_html(msg: &InvoiceMessage) -> String {
    let client = escape(msg.client_name.as_deref().unwrap_or("Customer"));
    let business = escape(msg.business_name.as_deref().unwrap_or_default());
    let number = escape(&msg.invoice_number);
    let due = escape(&format_long_date(msg.due_date.as_deref()));
    let total = money(msg.total);

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family:-apple-system,'Segoe UI',Roboto,sans-serif;background-color:#f3f4f6;margin:0;padding:40px 20px;">
<div style="max-width:500px;margin:0 auto;background:white;border-radius:16px;overflow:hidden;">
  <div style="background:linear-gradient(135deg,#f59e0b 0%,#d97706 100%);padding:24px;text-align:center;">
    <h1 style="color:white;margin:0;font-size:20px;">Payment Reminder</h1>
  </div>
  <div style="padding:32px;">
    <p>Dear <strong>{client}</strong>,</p>
    <p style="color:#6b7280;">This is a friendly reminder that your invoice is pending payment.</p>
    <div style="background:#fef3c7;border-radius:12px;padding:20px;margin:24px 0;text-align:center;">
      <p style="margin:0;font-size:12px;color:#92400e;">Invoice #{number}</p>
      <p style="margin:8px 0 0 0;font-size:28px;font-weight:700;color:#d97706;">{total}</p>
      <p style="margin:8px 0 0 0;color:#92400e;">Due: {due}</p>
    </div>
    <p style="color:#6b7280;">Please arrange payment at your earliest convenience.</p>
    <p style="margin-top:24px;">Thank you,<br><strong>{business}</strong></p>
  </div>
</div>
</body>
</html>
"#
    )
}

pub fn reminder_text(msg: &InvoiceMessage) -> String {
    format!(
        "Payment Reminder\n\nDear {client},\n\n\
This is a friendly reminder that Invoice #{number} for {total} was due on {due}.\n\n\
Please arrange payment at your earliest convenience.\n\nThank you,\n{business}\n",
        client = msg.client_name.as_deref().unwrap_or("Customer"),
        number = msg.invoice_number,
        total = money(msg.total),
        due = format_long_date(msg.due_date.as_deref()),
        business = msg.business_name.as_deref().unwrap_or_default(),
    )
}
