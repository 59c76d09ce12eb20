use navtree::config::DataConfig;
use navtree::services::source::LocalDocSource;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Every indexed reference of the fixture, its node path and the label of
/// the node it resolves to
pub const INDEXED: &[(&str, &[usize], &str)] = &[
    ("_f_i_f_o_8h.html", &[1, 0, 0], "FIFO.h"),
    ("_f_i_f_o_8h.html#a3", &[1, 0, 0, 0], "AddIndexFifo"),
    ("_o_s_8c.html", &[1, 0, 1], "OS.c"),
    ("annotated.html", &[0], "Data Structures"),
    ("classes.html", &[0, 1], "Data Structure Index"),
    ("files.html", &[1], "Files"),
    ("functions.html", &[0, 2], "Data Fields"),
    ("functions_vars.html", &[0, 2, 1], "Variables"),
    ("globals.html", &[1, 1], "Globals"),
    ("globals.html#index_a", &[1, 1, 0, 0], "a"),
    ("globals_func.html", &[1, 1, 1], "Functions"),
    ("index.html", &[], "SikendeRTOS"),
    ("structfifo.html", &[0, 0, 1], "fifo"),
    ("structtcb.html", &[0, 0, 0], "tcb"),
    ("structtcb.html#a1", &[0, 0, 0, 0], "next"),
    ("structtcb.html#a2", &[0, 0, 0, 1], "sp"),
];

const NAVTREEDATA: &str = r#"/*
 @licstart  The following is the entire license notice for the JavaScript code in this file.
 @licend  The above is the entire license notice for the JavaScript code in this file
*/
var NAVTREE =
[
  [ "SikendeRTOS", "index.html", [
    [ "Data Structures", "annotated.html", [
      [ "Data Structures", "annotated.html", "annotated_dup" ],
      [ "Data Structure Index", "classes.html", null ],
      [ "Data Fields", "functions.html", [
        [ "All", "functions.html", null ],
        [ "Variables", "functions_vars.html", null ]
      ] ]
    ] ],
    [ "Files", "files.html", [
      [ "File List", "files.html", "files_dup" ],
      [ "Globals", "globals.html", [
        [ "All", "globals.html", "globals_dup" ],
        [ "Functions", "globals_func.html", null ]
      ] ]
    ] ]
  ] ]
];

var NAVTREEINDEX =
[
"_f_i_f_o_8h.html",
"globals.html"
];

var SYNCONMSG = 'click to disable panel synchronisation';
var SYNCOFFMSG = 'click to enable panel synchronisation';
"#;

const SUBTREES: &[(&str, &str)] = &[
    (
        "annotated_dup",
        r#"var annotated_dup =
[
    [ "tcb", "structtcb.html", "structtcb" ],
    [ "fifo", "structfifo.html", null ]
];"#,
    ),
    (
        "structtcb",
        r#"var structtcb =
[
    [ "next", "structtcb.html#a1", null ],
    [ "sp", "structtcb.html#a2", null ]
];"#,
    ),
    (
        "files_dup",
        r#"var files_dup =
[
    [ "FIFO.h", "_f_i_f_o_8h.html", "_f_i_f_o_8h" ],
    [ "OS.c", "_o_s_8c.html", null ]
];"#,
    ),
    (
        "_f_i_f_o_8h",
        r#"var _f_i_f_o_8h =
[
    [ "AddIndexFifo", "_f_i_f_o_8h.html#a3", null ]
];"#,
    ),
    (
        "globals_dup",
        r#"var globals_dup =
[
    [ "a", "globals.html#index_a", null ]
];"#,
    ),
];

/// A generated documentation directory in a temp dir
pub struct DocsFixture {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl DocsFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        fs::write(path.join("navtreedata.js"), NAVTREEDATA).unwrap();
        for (name, script) in SUBTREES {
            fs::write(path.join(format!("{name}.js")), script).unwrap();
        }

        // split the index the way the generator does: chunk heads listed above
        let (first, second) = INDEXED.split_at(8);
        for (chunk, entries) in [first, second].into_iter().enumerate() {
            let body: Vec<String> = entries
                .iter()
                .map(|(reference, path, _)| format!("\"{reference}\":{path:?}"))
                .collect();
            fs::write(
                path.join(format!("navtreeindex{chunk}.js")),
                format!(
                    "var NAVTREEINDEX{chunk} =\n{{\n{}\n}};\n",
                    body.join(",\n")
                ),
            )
            .unwrap();
        }

        Self {
            _temp_dir: temp_dir,
            path,
        }
    }

    pub fn source(&self) -> LocalDocSource {
        LocalDocSource::new(self.path.clone(), DataConfig::default())
    }

    /// Delete one generated file, as if the output were incomplete
    pub fn remove(&self, file_name: &str) -> Vec<u8> {
        let path = self.path.join(file_name);
        let contents = fs::read(&path).unwrap();
        fs::remove_file(path).unwrap();
        contents
    }

    pub fn restore(&self, file_name: &str, contents: &[u8]) {
        fs::write(self.path.join(file_name), contents).unwrap();
    }
}
