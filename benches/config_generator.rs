//! Generates synthetic xorg.conf files of roughly the requested line count for benchmarking

/// Lines written per head: one Device, one Monitor and one Screen section
const LINES_PER_HEAD: usize = 24;

pub fn generate_config(target_lines: usize) -> String {
    let heads = (target_lines / LINES_PER_HEAD).max(1);
    let mut output = String::with_capacity(target_lines * 32);

    output.push_str("# Synthetic benchmark config\n\n");
    output.push_str("Section \"Module\"\n    Load \"glx\"\n    Load \"dri\"\nEndSection\n\n");

    for head in 0..heads {
        output.push_str(&format!(
            "Section \"Device\"\n    Identifier \"card{head}\"\n    Driver \"vesa\"\n    BusID \"PCI:{bus}:0:0\"\n    Option \"AccelMethod\" \"glamor\"\nEndSection\n\n",
            head = head,
            bus = head % 256
        ));
        output.push_str(&format!(
            "Section \"Monitor\"\n    Identifier \"monitor{head}\"\n    HorizSync 28-51\n    VertRefresh 43-60\n    # panel {head}\nEndSection\n\n",
            head = head
        ));
        output.push_str(&format!(
            "Section \"Screen\"\n    Identifier \"screen{head}\"\n    Device \"card{head}\"\n    Monitor \"monitor{head}\"\n    DefaultDepth 24\n    SubSection \"Display\"\n        Depth 24\n        Modes \"1920x1080\"\n    EndSubSection\nEndSection\n\n",
            head = head
        ));
    }

    output.push_str("Section \"ServerLayout\"\n    Identifier \"layout\"\n");
    for head in 0..heads {
        output.push_str(&format!("    Screen {head} \"screen{head}\"\n", head = head));
    }
    output.push_str("EndSection\n");

    output
}
