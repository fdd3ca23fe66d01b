#![allow(dead_code)]

use assert_fs::TempDir;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use teamcity_runner::installation::version::{METADATA_ARCHIVE, VERSION_RESOURCE};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Java XML properties document as shipped in common-api.jar
pub fn version_properties(version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE properties SYSTEM "http://java.sun.com/dtd/properties.dtd">
<properties>
<entry key="Display_Version">{}</entry>
<entry key="Build_Number">147412</entry>
</properties>
"#,
        version
    )
}

/// Write a zip archive with the given name/content entries
pub fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Put a metadata archive reporting `version` into the installation
pub fn write_metadata_archive(install_dir: &Path, version: &str) {
    let properties = version_properties(version);
    write_archive(
        &install_dir.join(METADATA_ARCHIVE),
        &[(VERSION_RESOURCE, properties.as_str())],
    );
}

/// Write `bin/runAll.sh` with the given bash body
pub fn write_control_script(install_dir: &Path, body: &str) {
    let bin = install_dir.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    std::fs::write(bin.join("runAll.sh"), format!("#!/bin/bash\n{}\n", body)).unwrap();
}

/// Installation of `version` whose control script runs `script_body`
pub fn installation(version: &str, script_body: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_control_script(dir.path(), script_body);
    write_metadata_archive(dir.path(), version);
    dir
}

/// Script that records its verb and the launch environment in `calls.log`
pub const RECORDING_SCRIPT: &str = r#"echo "action=$1" >> calls.log
echo "TEAMCITY_DATA_PATH=$TEAMCITY_DATA_PATH" >> calls.log
echo "TEAMCITY_SERVER_OPTS=$TEAMCITY_SERVER_OPTS" >> calls.log
echo "TEAMCITY_AGENT_OPTS=$TEAMCITY_AGENT_OPTS" >> calls.log
echo "$1 requested"
echo "done with $1" 1>&2"#;
