//! Domain models shared across the pipeline.

mod event;
mod record;

pub use event::{
    decode_object_key, BucketEntity, IngestEvent, Notification, NotificationRecord, ObjectEntity,
    S3Entity,
};
pub use record::{ImageRecord, RecordIdentity, SizeVariant};
