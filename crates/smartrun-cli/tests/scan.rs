use std::fs;

mod common;

use common::{parse_json, smartrun};

#[test]
fn scan_reports_packages_as_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("analysis.py"),
        "import os\nimport numpy as np\n#smartrun: pandas<=2.3.0\nimport pandas as pd\nfrom sklearn import linear_model\nimport cv2\n",
    )
    .expect("script");

    let assert = smartrun(temp.path())
        .args(["scan", "analysis.py", "--json"])
        .assert()
        .success();
    let payload = parse_json(&assert.get_output().stdout);
    assert_eq!(payload["status"], "ok");
    assert_eq!(
        payload["details"]["specs"],
        serde_json::json!(["numpy", "pandas<=2.3.0", "scikit-learn", "opencv-python"])
    );
}

#[test]
fn scan_prints_a_human_summary() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("job.py"), "import requests\nimport rich\n").expect("script");

    let assert = smartrun(temp.path()).args(["scan", "job.py"]).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    assert!(
        stdout.contains("smartrun scan: found 2 package(s)"),
        "unexpected output: {stdout}"
    );
    assert!(stdout.contains("requests"));
}

#[test]
fn scan_honors_exclude_and_notebooks() {
    let temp = tempfile::tempdir().expect("tempdir");
    let notebook = r#"{"cells": [
        {"cell_type": "code", "source": "%matplotlib inline\nimport matplotlib.pyplot as plt\nimport seaborn"},
        {"cell_type": "markdown", "source": "import not_code"}
    ]}"#;
    fs::write(temp.path().join("eda.ipynb"), notebook).expect("notebook");

    let assert = smartrun(temp.path())
        .args(["scan", "eda.ipynb", "--exclude", "seaborn", "--json"])
        .assert()
        .success();
    let payload = parse_json(&assert.get_output().stdout);
    assert_eq!(payload["details"]["specs"], serde_json::json!(["matplotlib"]));
}

#[test]
fn missing_script_exits_with_user_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = smartrun(temp.path())
        .args(["scan", "ghost.py", "--json"])
        .assert()
        .code(1);
    let payload = parse_json(&assert.get_output().stdout);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["reason"], "script_not_found");
}
