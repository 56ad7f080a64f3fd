//! Raw endpoint access through the authenticated client.

use std::path::Path;

use serde_json::Value;

use mebelplace_api::{RequestDescriptor, Upload};
use mebelplace_core::QueryClient;

use super::util;
use crate::cli::{ApiArgs, ApiCommand, BodyArgs};
use crate::error::CliError;
use crate::output::Printer;

pub async fn handle(args: ApiArgs, client: &QueryClient, printer: &Printer) -> Result<(), CliError> {
    let descriptor = match args.command {
        ApiCommand::Get { path, params } => {
            let mut descriptor = RequestDescriptor::get(path);
            for (key, value) in util::parse_pairs(&params, "param")? {
                descriptor = descriptor.query_param(key, value);
            }
            descriptor
        }
        ApiCommand::Post { path, body } => with_body(RequestDescriptor::post(path), &body)?,
        ApiCommand::Put { path, body } => with_body(RequestDescriptor::put(path), &body)?,
        ApiCommand::Patch { path, body } => with_body(RequestDescriptor::patch(path), &body)?,
        ApiCommand::Delete { path } => RequestDescriptor::delete(path),
        ApiCommand::Upload {
            path,
            files,
            fields,
        } => RequestDescriptor::post(path).multipart(build_upload(&files, &fields)?),
    };

    tracing::debug!(method = %descriptor.method, path = %descriptor.path, "sending request");

    // `data` is optional here: some mutations answer with only a message.
    let data = client.api().send::<Option<Value>>(descriptor).await?;
    match data {
        Some(value) => printer.value(&value),
        None => {
            printer.message("OK");
            Ok(())
        }
    }
}

fn with_body(descriptor: RequestDescriptor, body: &BodyArgs) -> Result<RequestDescriptor, CliError> {
    Ok(match util::read_body(body)? {
        Some(json) => descriptor.json_value(json),
        None => descriptor,
    })
}

fn build_upload(files: &[String], fields: &[String]) -> Result<Upload, CliError> {
    let mut upload = Upload::new();
    for (name, value) in util::parse_pairs(fields, "field")? {
        upload = upload.text(name, value);
    }
    for (name, raw_path) in util::parse_pairs(files, "file")? {
        let path = Path::new(&raw_path);
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| raw_path.clone(), |n| n.to_string_lossy().into_owned());
        upload = upload.file(name, file_name, bytes);
    }
    Ok(upload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mebelplace_api::executor::UploadPart;

    use super::*;

    #[test]
    fn upload_reads_files_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("sofa.jpg");
        std::fs::write(&photo, b"jpegbytes").unwrap();

        let upload = build_upload(
            &[format!("images={}", photo.display())],
            &["title=Sofa".to_owned()],
        )
        .unwrap();

        let parts = upload.parts();
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], UploadPart::Text { name, value } if name == "title" && value == "Sofa"));
        assert!(matches!(
            &parts[1],
            UploadPart::File { name, file_name, bytes, .. }
                if name == "images" && file_name == "sofa.jpg" && bytes.as_ref() == b"jpegbytes"
        ));
    }

    #[test]
    fn missing_upload_file_is_io_error() {
        let err = build_upload(&["images=/definitely/not/here.jpg".to_owned()], &[]).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }
}
