/// Wavefront OBJ parser producing an interleaved triangle list
///
/// Only `v`, `vt` and `f` records are interpreted; everything else is skipped.
/// Polygons are fan-triangulated around their first vertex.
use nom::{
    branch::alt,
    character::complete::{char, i64 as index, multispace0, multispace1},
    combinator::{all_consuming, eof, map, opt, peek, verify},
    number::complete::float,
    sequence::{preceded, tuple},
    IResult,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geometry::{Vertex, VertexStream};
use crate::math::Vec3;

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to read OBJ file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: malformed record `{record}`")]
    Parse { line: usize, record: String },
    #[error("OBJ data produced no vertices")]
    Empty,
}

/// One `p[/t[/n]]` reference from a face record, indices still 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FaceRef {
    position: i64,
    texcoord: Option<i64>,
}

/// Read and parse an OBJ file.
pub fn load_obj(path: impl AsRef<Path>) -> Result<VertexStream, ObjError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ObjError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stream = parse_obj(&text)?;
    log::info!(
        "OBJ loaded: {}, vertices: {}",
        path.display(),
        stream.vertex_count()
    );
    Ok(stream)
}

/// Parse OBJ text into a triangle list.
///
/// Face vertices whose position index is non-positive or past the positions
/// declared so far are dropped individually; malformed numbers fail the whole
/// input.
pub fn parse_obj(input: &str) -> Result<VertexStream, ObjError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();
    let mut stream = VertexStream::new();
    let mut skipped = 0usize;

    for (line_index, line) in input.lines().enumerate() {
        let line = line.trim();
        let Some(prefix) = line.split_whitespace().next() else {
            continue;
        };
        let body = &line[prefix.len()..];
        let malformed = || ObjError::Parse {
            line: line_index + 1,
            record: line.to_string(),
        };

        match prefix {
            "v" => {
                let (_, (x, y, z)) = parse_vector3(body).map_err(|_| malformed())?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let (_, uv) = parse_texcoord(body).map_err(|_| malformed())?;
                texcoords.push(uv);
            }
            "f" => {
                let refs = body
                    .split_whitespace()
                    .map(|token| parse_face_ref(token).map(|(_, r)| r))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| malformed())?;
                if refs.len() < 3 {
                    continue;
                }
                for i in 1..refs.len() - 1 {
                    for r in [refs[0], refs[i], refs[i + 1]] {
                        match resolve(r, &positions, &texcoords) {
                            Some(vertex) => stream.push(vertex),
                            None => {
                                log::debug!(
                                    "line {}: skipping face vertex with position index {}",
                                    line_index + 1,
                                    r.position
                                );
                                skipped += 1;
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if skipped > 0 {
        log::warn!("OBJ: skipped {skipped} face vertices with out-of-range positions");
    }
    if stream.is_empty() {
        return Err(ObjError::Empty);
    }
    Ok(stream)
}

fn resolve(r: FaceRef, positions: &[Vec3], texcoords: &[[f32; 2]]) -> Option<Vertex> {
    let position = *lookup(positions, r.position)?;
    let uv = r
        .texcoord
        .and_then(|t| lookup(texcoords, t))
        .copied()
        .unwrap_or([0.0, 0.0]);
    Some(Vertex::new(position, uv))
}

/// 1-based lookup; zero, negative and past-the-end indices give `None`.
fn lookup<T>(items: &[T], one_based: i64) -> Option<&T> {
    let i = usize::try_from(one_based).ok()?.checked_sub(1)?;
    items.get(i)
}

/// A finite float that ends at whitespace or end of input.
fn component(input: &str) -> IResult<&str, f32> {
    let (input, _) = multispace0(input)?;
    let (input, value) = verify(float, |v: &f32| v.is_finite())(input)?;
    let (input, _) = peek(alt((multispace1, eof)))(input)?;
    Ok((input, value))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, x) = component(input)?;
    let (input, y) = component(input)?;
    let (input, z) = component(input)?;
    Ok((input, (x, y, z)))
}

fn parse_texcoord(input: &str) -> IResult<&str, [f32; 2]> {
    let (input, u) = component(input)?;
    let (input, v) = component(input)?;
    Ok((input, [u, v]))
}

/// An empty position (`/2`) reads as index 0, which never resolves.
fn parse_face_ref(token: &str) -> IResult<&str, FaceRef> {
    let (rest, (position, texcoord, _normal)) = all_consuming(tuple((
        map(opt(index), Option::unwrap_or_default),
        opt(preceded(char('/'), opt(index))),
        opt(preceded(char('/'), opt(index))),
    )))(token)?;
    Ok((
        rest,
        FaceRef {
            position,
            texcoord: texcoord.flatten(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";

    fn positions(stream: &VertexStream) -> Vec<Vec3> {
        stream.vertices().map(|v| v.position).collect()
    }

    #[test]
    fn test_quad_fan_triangulated() {
        let stream = parse_obj(QUAD).unwrap();
        assert_eq!(stream.vertex_count(), 6);
        assert_eq!(stream.triangle_count(), 2);

        let p = positions(&stream);
        let declared = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        assert_eq!(&p[0..3], &[declared[0], declared[1], declared[2]]);
        // second triangle shares the first and third corners of the quad
        assert_eq!(&p[3..6], &[declared[0], declared[2], declared[3]]);
        assert_eq!(stream.vertex(5).unwrap().uv, [0.0, 1.0]);
    }

    #[test]
    fn test_pentagon_yields_three_triangles_in_fan_order() {
        let text = "v 0 0 0\nv 1 0 0\nv 2 1 0\nv 1 2 0\nv 0 1 0\nf 1 2 3 4 5\n";
        let stream = parse_obj(text).unwrap();
        assert_eq!(stream.triangle_count(), 3);
        let xs: Vec<f32> = positions(&stream).iter().map(|p| p.x + p.y * 10.0).collect();
        assert_eq!(
            xs,
            vec![0.0, 1.0, 12.0, 0.0, 12.0, 21.0, 0.0, 21.0, 10.0]
        );
    }

    #[test]
    fn test_reference_forms() {
        let text = "\
v 1 2 3
v 4 5 6
v 7 8 9
vt 0.5 0.25
vn 0 0 1
f 1/1/1 2//1 3/
";
        let stream = parse_obj(text).unwrap();
        let uvs: Vec<[f32; 2]> = stream.vertices().map(|v| v.uv).collect();
        assert_eq!(uvs, vec![[0.5, 0.25], [0.0, 0.0], [0.0, 0.0]]);
    }

    #[test]
    fn test_missing_or_bad_texcoord_defaults_to_origin() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.3 0.6\nf 1 2/9 3/-1\n";
        let stream = parse_obj(text).unwrap();
        assert!(stream.vertices().all(|v| v.uv == [0.0, 0.0]));
    }

    #[test]
    fn test_out_of_range_positions_are_skipped() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nf 0 1 2\nf 1 2 7\n";
        let stream = parse_obj(text).unwrap();
        // 3 from the valid face, 2 each from the faces with one bad reference
        assert_eq!(stream.vertex_count(), 7);
    }

    #[test]
    fn test_forward_reference_is_out_of_range() {
        let text = "v 0 0 0\nv 1 0 0\nf 1 2 3\nv 0 1 0\nf 1 2 3\n";
        let stream = parse_obj(text).unwrap();
        assert_eq!(stream.vertex_count(), 5);
    }

    #[test]
    fn test_short_faces_ignored() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2\nf 1 2 3\n";
        assert_eq!(parse_obj(text).unwrap().vertex_count(), 3);
    }

    #[test]
    fn test_comments_blank_lines_and_crlf() {
        let text = "# cube\r\n\r\no thing\r\n  v 0 0 0\r\nv 1 0 0\r\nv 0 1 0\r\nusemtl x\r\nf 1 2 3\r\n";
        assert_eq!(parse_obj(text).unwrap().vertex_count(), 3);
    }

    #[test]
    fn test_extra_components_ignored() {
        let text = "v 0 0 0 1\nv 1 0 0 1\nv 0 1 0 1\nvt 0.5 0.5 0\nf 1/1 2/1 3/1\n";
        let stream = parse_obj(text).unwrap();
        assert_eq!(stream.vertex(2).unwrap().position, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(parse_obj(""), Err(ObjError::Empty)));
    }

    #[test]
    fn test_no_faces_fails() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\n";
        assert!(matches!(parse_obj(text), Err(ObjError::Empty)));
    }

    #[test]
    fn test_all_vertices_skipped_fails() {
        let text = "v 0 0 0\nf 4 5 6\n";
        assert!(matches!(parse_obj(text), Err(ObjError::Empty)));
    }

    #[test]
    fn test_malformed_numbers_report_line() {
        let text = "v 0 0 0\nv 1 x 0\n";
        match parse_obj(text) {
            Err(ObjError::Parse { line, record }) => {
                assert_eq!(line, 2);
                assert_eq!(record, "v 1 x 0");
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        assert!(matches!(
            parse_obj("v 0 0\n"),
            Err(ObjError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nvt 1.0.0 2\n"),
            Err(ObjError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nf 1 a 1\n"),
            Err(ObjError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nf 1/x 1 1\n"),
            Err(ObjError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        assert!(matches!(
            parse_obj("v nan 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"),
            Err(ObjError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt inf 0\nf 1/1 2 3\n"),
            Err(ObjError::Parse { line: 4, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 -infinity 0\n"),
            Err(ObjError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_empty_position_index_skips_vertex() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nf 1/1 2/1 /1 3/1\n";
        let stream = parse_obj(text).unwrap();
        // fan (1,2,_) (1,_,3): the empty reference drops one vertex from each
        assert_eq!(stream.vertex_count(), 4);
        assert_eq!(
            positions(&stream),
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_obj("/definitely/not/here.obj").unwrap_err();
        assert!(matches!(err, ObjError::Io { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("orrery-quad-{}.obj", std::process::id()));
        fs::write(&path, QUAD).unwrap();
        let stream = load_obj(&path);
        fs::remove_file(&path).ok();
        assert_eq!(stream.unwrap().vertex_count(), 6);
    }
}
