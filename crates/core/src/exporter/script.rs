//! Ruby automation script run by the authoring application at startup.

use std::path::Path;

const TEMPLATE: &str = r#"# glbforge export script for job @@JOB_ID@@
log_path = '@@LOG_PATH@@'
output_path = '@@OUTPUT_PATH@@'

def glbforge_log(path, message)
  File.open(path, 'a') { |f| f.puts("[glbforge] #{message}") }
rescue StandardError
  nil
end

glbforge_log(log_path, 'BEGIN')
begin
  model = Sketchup.active_model
  if model.nil?
    glbforge_log(log_path, 'ERROR no active model')
  else
    materials = model.materials
    glbforge_log(log_path, "MATERIALS count=#{materials.length}")
    materials.each do |material|
      texture = material.texture
      if texture
        glbforge_log(log_path, "MATERIAL #{material.display_name} texture=#{texture.filename} size=#{texture.image_width}x#{texture.image_height}")
      else
        glbforge_log(log_path, "MATERIAL #{material.display_name} texture=none")
      end
    end

    options = {
      :triangulated_faces => true,
      :doublesided_faces => true,
      :edges => false,
      :author_attribution => false,
      :texture_maps => true,
      :selectionset_only => false,
      :preserve_instancing => true
    }
    result = model.export(output_path, options)
    glbforge_log(log_path, "EXPORT result=#{result}")
    model.close(true)
  end
rescue StandardError => e
  glbforge_log(log_path, "ERROR #{e.class}: #{e.message}")
ensure
  glbforge_log(log_path, 'QUIT')
  Sketchup.quit
end
"#;

/// Render the export script for one job.
pub fn render_export_script(job_id: &str, output_path: &Path, log_path: &Path) -> String {
    TEMPLATE
        .replace("@@JOB_ID@@", &sanitize_comment(job_id))
        .replace("@@LOG_PATH@@", &ruby_single_quoted(log_path))
        .replace("@@OUTPUT_PATH@@", &ruby_single_quoted(output_path))
}

/// Body of a single-quoted Ruby literal. Ruby on Windows accepts forward slashes.
fn ruby_single_quoted(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('\'', "\\'")
}

fn sanitize_comment(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_embeds_paths() {
        let script = render_export_script(
            "conv-1",
            Path::new("/scratch/f1/conv-1/export/model.dae"),
            Path::new("/scratch/f1/conv-1/export.log"),
        );
        assert!(script.contains("log_path = '/scratch/f1/conv-1/export.log'"));
        assert!(script.contains("output_path = '/scratch/f1/conv-1/export/model.dae'"));
        assert!(script.contains("job conv-1"));
        assert!(!script.contains("@@"));
    }

    #[test]
    fn test_script_closes_without_saving_and_quits() {
        let script = render_export_script("j", Path::new("o.dae"), Path::new("l.log"));
        assert!(script.contains("model.close(true)"));
        assert!(script.contains("Sketchup.quit"));
        assert!(script.contains("'BEGIN'"));
        assert!(script.contains("'QUIT'"));
        assert!(script.contains("EXPORT result="));
        assert!(script.contains("MATERIALS count="));
    }

    #[test]
    fn test_paths_are_escaped() {
        let script = render_export_script(
            "j",
            Path::new(r"C:\Users\o'neil\model.dae"),
            Path::new("l.log"),
        );
        assert!(script.contains(r"output_path = 'C:/Users/o\'neil/model.dae'"));
    }
}
