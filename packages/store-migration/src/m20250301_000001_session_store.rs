use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum WhatsmeowDevice {
    #[iden = "whatsmeow_device"]
    Table,
    Jid,
    Lid,
    FacebookUuid,
    RegistrationId,
    NoiseKey,
    IdentityKey,
    SignedPreKey,
    SignedPreKeyId,
    SignedPreKeySig,
    AdvKey,
    AdvDetails,
    AdvAccountSig,
    AdvAccountSigKey,
    AdvDeviceSig,
    Platform,
    BusinessName,
    PushName,
    LidMigrationTs,
}

#[derive(Iden)]
enum WhatsmeowIdentityKeys {
    #[iden = "whatsmeow_identity_keys"]
    Table,
    OurJid,
    TheirId,
    Identity,
}

#[derive(Iden)]
enum WhatsmeowPreKeys {
    #[iden = "whatsmeow_pre_keys"]
    Table,
    Jid,
    KeyId,
    Key,
    Uploaded,
}

#[derive(Iden)]
enum WhatsmeowSessions {
    #[iden = "whatsmeow_sessions"]
    Table,
    OurJid,
    TheirId,
    Session,
}

#[derive(Iden)]
enum WhatsmeowSenderKeys {
    #[iden = "whatsmeow_sender_keys"]
    Table,
    OurJid,
    ChatId,
    SenderId,
    SenderKey,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WhatsmeowDevice::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WhatsmeowDevice::Jid).text().not_null().primary_key())
                    .col(ColumnDef::new(WhatsmeowDevice::Lid).text())
                    .col(ColumnDef::new(WhatsmeowDevice::FacebookUuid).text())
                    .col(ColumnDef::new(WhatsmeowDevice::RegistrationId).big_integer().not_null())
                    .col(ColumnDef::new(WhatsmeowDevice::NoiseKey).binary().not_null())
                    .col(ColumnDef::new(WhatsmeowDevice::IdentityKey).binary().not_null())
                    .col(ColumnDef::new(WhatsmeowDevice::SignedPreKey).binary().not_null())
                    .col(ColumnDef::new(WhatsmeowDevice::SignedPreKeyId).integer().not_null())
                    .col(ColumnDef::new(WhatsmeowDevice::SignedPreKeySig).binary().not_null())
                    .col(ColumnDef::new(WhatsmeowDevice::AdvKey).binary())
                    .col(ColumnDef::new(WhatsmeowDevice::AdvDetails).binary())
                    .col(ColumnDef::new(WhatsmeowDevice::AdvAccountSig).binary())
                    .col(ColumnDef::new(WhatsmeowDevice::AdvAccountSigKey).binary())
                    .col(ColumnDef::new(WhatsmeowDevice::AdvDeviceSig).binary())
                    .col(ColumnDef::new(WhatsmeowDevice::Platform).text().not_null().default(""))
                    .col(ColumnDef::new(WhatsmeowDevice::BusinessName).text().not_null().default(""))
                    .col(ColumnDef::new(WhatsmeowDevice::PushName).text().not_null().default(""))
                    .col(
                        ColumnDef::new(WhatsmeowDevice::LidMigrationTs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WhatsmeowIdentityKeys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WhatsmeowIdentityKeys::OurJid).text().not_null())
                    .col(ColumnDef::new(WhatsmeowIdentityKeys::TheirId).text().not_null())
                    .col(ColumnDef::new(WhatsmeowIdentityKeys::Identity).binary().not_null())
                    .primary_key(
                        Index::create()
                            .col(WhatsmeowIdentityKeys::OurJid)
                            .col(WhatsmeowIdentityKeys::TheirId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_identity_keys_device")
                            .from(WhatsmeowIdentityKeys::Table, WhatsmeowIdentityKeys::OurJid)
                            .to(WhatsmeowDevice::Table, WhatsmeowDevice::Jid)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WhatsmeowPreKeys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WhatsmeowPreKeys::Jid).text().not_null())
                    .col(ColumnDef::new(WhatsmeowPreKeys::KeyId).integer().not_null())
                    .col(ColumnDef::new(WhatsmeowPreKeys::Key).binary().not_null())
                    .col(
                        ColumnDef::new(WhatsmeowPreKeys::Uploaded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(WhatsmeowPreKeys::Jid)
                            .col(WhatsmeowPreKeys::KeyId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pre_keys_device")
                            .from(WhatsmeowPreKeys::Table, WhatsmeowPreKeys::Jid)
                            .to(WhatsmeowDevice::Table, WhatsmeowDevice::Jid)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WhatsmeowSessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WhatsmeowSessions::OurJid).text().not_null())
                    .col(ColumnDef::new(WhatsmeowSessions::TheirId).text().not_null())
                    .col(ColumnDef::new(WhatsmeowSessions::Session).binary())
                    .primary_key(
                        Index::create()
                            .col(WhatsmeowSessions::OurJid)
                            .col(WhatsmeowSessions::TheirId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_device")
                            .from(WhatsmeowSessions::Table, WhatsmeowSessions::OurJid)
                            .to(WhatsmeowDevice::Table, WhatsmeowDevice::Jid)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WhatsmeowSenderKeys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WhatsmeowSenderKeys::OurJid).text().not_null())
                    .col(ColumnDef::new(WhatsmeowSenderKeys::ChatId).text().not_null())
                    .col(ColumnDef::new(WhatsmeowSenderKeys::SenderId).text().not_null())
                    .col(ColumnDef::new(WhatsmeowSenderKeys::SenderKey).binary().not_null())
                    .primary_key(
                        Index::create()
                            .col(WhatsmeowSenderKeys::OurJid)
                            .col(WhatsmeowSenderKeys::ChatId)
                            .col(WhatsmeowSenderKeys::SenderId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sender_keys_device")
                            .from(WhatsmeowSenderKeys::Table, WhatsmeowSenderKeys::OurJid)
                            .to(WhatsmeowDevice::Table, WhatsmeowDevice::Jid)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WhatsmeowSenderKeys::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WhatsmeowSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WhatsmeowPreKeys::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WhatsmeowIdentityKeys::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WhatsmeowDevice::Table).to_owned())
            .await
    }
}
