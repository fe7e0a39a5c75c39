//! `pom.xml` synthesis for a staged variant.

use crate::config::BuildOptions;
use crate::jar::variant::JarVariant;

const EXTENSIONS_GROUP_ID: &str = "io.phasetwo.keycloak";
const ACCOUNT_V1_ARTIFACT_ID: &str = "keycloak-account-v1";
const ADDITIONAL_INFO_ARTIFACT_ID: &str = "keycloak-theme-additional-info-extension";

/// Render the Maven project descriptor packaging one variant.
///
/// Extension dependencies are shaded into the theme jar so the server
/// loads them from the same provider.
pub fn generate_pom(options: &BuildOptions, variant: &JarVariant) -> String {
    let mut dependencies = Vec::new();
    if let Some(version) = variant.account_v1 {
        dependencies.push((ACCOUNT_V1_ARTIFACT_ID, version.as_str()));
    }
    if let Some(version) = variant.additional_info {
        dependencies.push((ADDITIONAL_INFO_ARTIFACT_ID, version.as_str()));
    }

    let dependencies = if dependencies.is_empty() {
        String::new()
    } else {
        let entries: String = dependencies
            .iter()
            .map(|(artifact_id, version)| {
                format!(
                    "    <dependency>\n      <groupId>{EXTENSIONS_GROUP_ID}</groupId>\n      <artifactId>{artifact_id}</artifactId>\n      <version>{version}</version>\n    </dependency>\n"
                )
            })
            .collect();
        format!("  <dependencies>\n{entries}  </dependencies>\n")
    };

    format!(
        r#"<?xml version="1.0"?>
<project xmlns="http://maven.apache.org/POM/4.0.0"
  xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
  xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/maven-v4_0_0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <groupId>{group_id}</groupId>
  <artifactId>{artifact_id}</artifactId>
  <version>{version}</version>
  <name>{artifact_id}</name>
  <description>Keycloak theme for Keycloak {range}</description>
  <packaging>jar</packaging>
  <properties>
    <project.build.sourceEncoding>UTF-8</project.build.sourceEncoding>
  </properties>
  <build>
    <plugins>
      <plugin>
        <groupId>org.apache.maven.plugins</groupId>
        <artifactId>maven-shade-plugin</artifactId>
        <version>3.5.1</version>
        <executions>
          <execution>
            <phase>package</phase>
            <goals>
              <goal>shade</goal>
            </goals>
          </execution>
        </executions>
      </plugin>
    </plugins>
  </build>
{dependencies}</project>
"#,
        group_id = escape_xml(&options.group_id),
        artifact_id = escape_xml(&options.artifact_id),
        version = escape_xml(&options.theme_version),
        range = variant.keycloak_version_range,
    )
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
