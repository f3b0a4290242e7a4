use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    IdentitySubject,
    FirstName,
    LastName,
    PersonalEmail,
    BusinessName,
    BusinessEmail,
    BusinessPhone,
    BusinessAddress,
    BusinessCategory,
    HourlyRate,
    LastInvoiceNumber,
    OnboardingComplete,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
    UserId,
    Name,
    Email,
    Address,
    Archived,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    UserId,
    ClientId,
    Title,
    Status,
    StartTime,
    EndTime,
    Location,
    InvoiceId,
    CalendarEventId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    UserId,
    ClientId,
    JobId,
    InvoiceNumber,
    InvoiceTitle,
    InvoiceDescription,
    Status,
    IssueDate,
    DueDate,
    LineItems,
    Total,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    UserId,
    JobId,
    VendorName,
    Date,
    TotalAmount,
    TaxAmount,
    Currency,
    LineItems,
    ReceiptImageUrl,
    CreatedAt,
}

fn id_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .string_len(24)
        .not_null()
        .primary_key()
        .to_owned()
}

fn ref_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).string_len(24).to_owned()
}

fn created_at_col<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_col(Users::Id))
                    .col(ColumnDef::new(Users::IdentitySubject).string())
                    .col(ColumnDef::new(Users::FirstName).string())
                    .col(ColumnDef::new(Users::LastName).string())
                    .col(ColumnDef::new(Users::PersonalEmail).string())
                    .col(ColumnDef::new(Users::BusinessName).string())
                    .col(ColumnDef::new(Users::BusinessEmail).string())
                    .col(ColumnDef::new(Users::BusinessPhone).string())
                    .col(ColumnDef::new(Users::BusinessAddress).string())
                    .col(ColumnDef::new(Users::BusinessCategory).string())
                    .col(ColumnDef::new(Users::HourlyRate).double())
                    .col(ColumnDef::new(Users::LastInvoiceNumber).big_integer())
                    .col(
                        ColumnDef::new(Users::OnboardingComplete)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(created_at_col(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ux_users_identity_subject")
                    .table(Users::Table)
                    .col(Users::IdentitySubject)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ux_users_business_email")
                    .table(Users::Table)
                    .col(Users::BusinessEmail)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(id_col(Clients::Id))
                    .col(ref_col(Clients::UserId))
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Email).string())
                    .col(ColumnDef::new(Clients::Address).string())
                    .col(
                        ColumnDef::new(Clients::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(created_at_col(Clients::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_clients_user_id")
                    .table(Clients::Table)
                    .col(Clients::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(id_col(Jobs::Id))
                    .col(ref_col(Jobs::UserId).not_null())
                    .col(ref_col(Jobs::ClientId))
                    .col(ColumnDef::new(Jobs::Title).string().not_null())
                    .col(
                        ColumnDef::new(Jobs::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Jobs::StartTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Jobs::EndTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Jobs::Location).string())
                    .col(ref_col(Jobs::InvoiceId))
                    .col(ColumnDef::new(Jobs::CalendarEventId).string())
                    .col(created_at_col(Jobs::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_jobs_user_id")
                    .table(Jobs::Table)
                    .col(Jobs::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(id_col(Invoices::Id))
                    .col(ref_col(Invoices::UserId).not_null())
                    .col(ref_col(Invoices::ClientId))
                    .col(ref_col(Invoices::JobId))
                    .col(ColumnDef::new(Invoices::InvoiceNumber).string().not_null())
                    .col(ColumnDef::new(Invoices::InvoiceTitle).string())
                    .col(ColumnDef::new(Invoices::InvoiceDescription).text())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Invoices::IssueDate).string())
                    .col(ColumnDef::new(Invoices::DueDate).string())
                    .col(ColumnDef::new(Invoices::LineItems).text().not_null())
                    .col(ColumnDef::new(Invoices::Total).double().not_null())
                    .col(created_at_col(Invoices::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_invoices_user_status")
                    .table(Invoices::Table)
                    .col(Invoices::UserId)
                    .col(Invoices::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(id_col(Expenses::Id))
                    .col(ref_col(Expenses::UserId).not_null())
                    .col(ref_col(Expenses::JobId))
                    .col(ColumnDef::new(Expenses::VendorName).string().not_null())
                    .col(ColumnDef::new(Expenses::Date).timestamp_with_time_zone())
                    .col(ColumnDef::new(Expenses::TotalAmount).double().not_null())
                    .col(ColumnDef::new(Expenses::TaxAmount).double())
                    .col(
                        ColumnDef::new(Expenses::Currency)
                            .string_len(8)
                            .not_null()
                            .default("USD"),
                    )
                    .col(ColumnDef::new(Expenses::LineItems).text().not_null())
                    .col(ColumnDef::new(Expenses::ReceiptImageUrl).string())
                    .col(created_at_col(Expenses::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_expenses_user_id")
                    .table(Expenses::Table)
                    .col(Expenses::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Expenses::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Jobs::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await
    }
}
