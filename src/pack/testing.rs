use super::PackAssembler;
use crate::limits::Limits;
use crate::media::testing::MockCodec;
use crate::media::{Decoder, Encoder};
use crate::platform::testing::MockSource;
use crate::platform::PackSource;
use crate::prelude::*;
use std::io::Read;
use std::sync::Arc;

pub(crate) fn assembler(source: MockSource, codec: MockCodec) -> (PackAssembler, Arc<MockCodec>) {
    assembler_with_limits(Arc::new(source), codec, Limits::default())
}

pub(crate) fn assembler_with_limits(
    source: Arc<MockSource>,
    codec: MockCodec,
    limits: Limits,
) -> (PackAssembler, Arc<MockCodec>) {
    let codec = Arc::new(codec);

    let source: Arc<dyn PackSource> = source;
    let decoder: Arc<dyn Decoder> = codec.clone();
    let encoder: Arc<dyn Encoder> = codec.clone();

    let assembler = PackAssembler::builder()
        .source(source)
        .decoder(decoder)
        .encoder(encoder)
        .limits(Arc::new(limits))
        .build();

    (assembler, codec)
}

fn open(archive: &Utf8Path) -> zip::ZipArchive<std::fs::File> {
    zip::ZipArchive::new(std::fs::File::open(archive).unwrap()).unwrap()
}

/// Names of the archive entries in their stored order
pub(crate) fn entry_names(archive: &Utf8Path) -> Vec<String> {
    let mut zip = open(archive);
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_owned())
        .collect()
}

pub(crate) fn read_entry(archive: &Utf8Path, name: &str) -> Vec<u8> {
    let mut zip = open(archive);
    let mut content = vec![];
    zip.by_name(name).unwrap().read_to_end(&mut content).unwrap();
    content
}
