//! Row <-> contract conversions. Reading fails only on corrupted rows.

use anyhow::Context;
use sea_orm::Set;

use super::entity::{clients, expenses, invoices, jobs, users};
use crate::contract::{Client, Expense, Invoice, Job, RecordId, User};

fn id(raw: &str) -> anyhow::Result<RecordId> {
    RecordId::parse(raw).with_context(|| format!("stored id '{raw}' is malformed"))
}

fn opt_id(raw: Option<&str>) -> anyhow::Result<Option<RecordId>> {
    raw.map(id).transpose()
}

pub fn user_from_row(m: users::Model) -> anyhow::Result<User> {
    Ok(User {
        id: id(&m.id)?,
        identity_subject: m.identity_subject,
        first_name: m.first_name,
        last_name: m.last_name,
        personal_email: m.personal_email,
        business_name: m.business_name,
        business_email: m.business_email,
        business_phone: m.business_phone,
        business_address: m.business_address,
        business_category: m.business_category,
        hourly_rate: m.hourly_rate,
        last_invoice_number: m.last_invoice_number,
        onboarding_complete: m.onboarding_complete,
        created_at: m.created_at,
    })
}

pub fn user_to_active(u: User) -> users::ActiveModel {
    users::ActiveModel {
        id: Set(u.id.to_string()),
        identity_subject: Set(u.identity_subject),
        first_name: Set(u.first_name),
        last_name: Set(u.last_name),
        personal_email: Set(u.personal_email),
        business_name: Set(u.business_name),
        business_email: Set(u.business_email),
        business_phone: Set(u.business_phone),
        business_address: Set(u.business_address),
        business_category: Set(u.business_category),
        hourly_rate: Set(u.hourly_rate),
        last_invoice_number: Set(u.last_invoice_number),
        onboarding_complete: Set(u.onboarding_complete),
        created_at: Set(u.created_at),
    }
}

pub fn client_from_row(m: clients::Model) -> anyhow::Result<Client> {
    Ok(Client {
        id: id(&m.id)?,
        user_id: opt_id(m.user_id.as_deref())?,
        name: m.name,
        email: m.email,
        address: m.address,
        archived: m.archived,
        created_at: m.created_at,
    })
}

pub fn client_to_active(c: Client) -> clients::ActiveModel {
    clients::ActiveModel {
        id: Set(c.id.to_string()),
        user_id: Set(c.user_id.map(|v| v.to_string())),
        name: Set(c.name),
        email: Set(c.email),
        address: Set(c.address),
        archived: Set(c.archived),
        created_at: Set(c.created_at),
    }
}

pub fn job_from_row(m: jobs::Model) -> anyhow::Result<Job> {
    Ok(Job {
        id: id(&m.id)?,
        user_id: id(&m.user_id)?,
        client_id: opt_id(m.client_id.as_deref())?,
        title: m.title,
        status: m
            .status
            .parse()
            .with_context(|| format!("job {} has bad status", m.id))?,
        start_time: m.start_time,
        end_time: m.end_time,
        location: m.location,
        invoice_id: opt_id(m.invoice_id.as_deref())?,
        calendar_event_id: m.calendar_event_id,
        created_at: m.created_at,
    })
}

pub fn job_to_active(j: Job) -> jobs::ActiveModel {
    jobs::ActiveModel {
        id: Set(j.id.to_string()),
        user_id: Set(j.user_id.to_string()),
        client_id: Set(j.client_id.map(|v| v.to_string())),
        title: Set(j.title),
        status: Set(j.status.as_str().to_string()),
        start_time: Set(j.start_time),
        end_time: Set(j.end_time),
        location: Set(j.location),
        invoice_id: Set(j.invoice_id.map(|v| v.to_string())),
        calendar_event_id: Set(j.calendar_event_id),
        created_at: Set(j.created_at),
    }
}

pub fn invoice_from_row(m: invoices::Model) -> anyhow::Result<Invoice> {
    Ok(Invoice {
        id: id(&m.id)?,
        user_id: id(&m.user_id)?,
        client_id: opt_id(m.client_id.as_deref())?,
        job_id: opt_id(m.job_id.as_deref())?,
        status: m
            .status
            .parse()
            .with_context(|| format!("invoice {} has bad status", m.id))?,
        line_items: serde_json::from_str(&m.line_items)
            .with_context(|| format!("invoice {} has bad line items", m.id))?,
        invoice_number: m.invoice_number,
        invoice_title: m.invoice_title,
        invoice_description: m.invoice_description,
        issue_date: m.issue_date,
        due_date: m.due_date,
        total: m.total,
        created_at: m.created_at,
    })
}

pub fn invoice_to_active(i: Invoice) -> anyhow::Result<invoices::ActiveModel> {
    Ok(invoices::ActiveModel {
        id: Set(i.id.to_string()),
        user_id: Set(i.user_id.to_string()),
        client_id: Set(i.client_id.map(|v| v.to_string())),
        job_id: Set(i.job_id.map(|v| v.to_string())),
        invoice_number: Set(i.invoice_number),
        invoice_title: Set(i.invoice_title),
        invoice_description: Set(i.invoice_description),
        status: Set(i.status.as_str().to_string()),
        issue_date: Set(i.issue_date),
        due_date: Set(i.due_date),
        line_items: Set(serde_json::to_string(&i.line_items).context("encode line items")?),
        total: Set(i.total),
        created_at: Set(i.created_at),
    })
}

pub fn expense_from_row(m: expenses::Model) -> anyhow::Result<Expense> {
    Ok(Expense {
        id: id(&m.id)?,
        user_id: id(&m.user_id)?,
        job_id: opt_id(m.job_id.as_deref())?,
        line_items: serde_json::from_str(&m.line_items)
            .with_context(|| format!("expense {} has bad line items", m.id))?,
        vendor_name: m.vendor_name,
        date: m.date,
        total_amount: m.total_amount,
        tax_amount: m.tax_amount,
        currency: m.currency,
        receipt_image_url: m.receipt_image_url,
        created_at: m.created_at,
    })
}

pub fn expense_to_active(e: Expense) -> anyhow::Result<expenses::ActiveModel> {
    Ok(expenses::ActiveModel {
        id: Set(e.id.to_string()),
        user_id: Set(e.user_id.to_string()),
        job_id: Set(e.job_id.map(|v| v.to_string())),
        vendor_name: Set(e.vendor_name),
        date: Set(e.date),
        total_amount: Set(e.total_amount),
        tax_amount: Set(e.tax_amount),
        currency: Set(e.currency),
        line_items: Set(serde_json::to_string(&e.line_items).context("encode line items")?),
        receipt_image_url: Set(e.receipt_image_url),
        created_at: Set(e.created_at),
    })
}
